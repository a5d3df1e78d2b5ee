use ndarray::ArrayView3;

/// A single captured frame: contiguous pixel bytes in row-major order.
///
/// Channel layout follows the capture source: 1 = gray, 3 = BGR,
/// 4 = BGRA. The tracker never owns frame acquisition; hosts hand frames
/// in and drop them afterwards.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    channels: u8,
    index: usize,
}

impl Frame {
    /// Wraps host-provided bytes as is. A buffer that doesn't match the
    /// dimensions is accepted here and rejected by [`as_ndarray`](Self::as_ndarray).
    pub fn new(data: Vec<u8>, width: u32, height: u32, channels: u8, index: usize) -> Self {
        Self {
            data,
            width,
            height,
            channels,
            index,
        }
    }

    /// A zero-sized frame, as delivered by a source that has nothing yet.
    pub fn empty(index: usize) -> Self {
        Self {
            data: Vec::new(),
            width: 0,
            height: 0,
            channels: 3,
            index,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }

    /// Pixel view shaped `(height, width, channels)`, or `None` when the
    /// buffer length disagrees with the declared dimensions.
    pub fn as_ndarray(&self) -> Option<ArrayView3<'_, u8>> {
        ArrayView3::from_shape(self.shape(), &self.data).ok()
    }

    fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_construction_and_accessors() {
        let data = vec![0u8; 12]; // 2x2x3
        let frame = Frame::new(data.clone(), 2, 2, 3, 5);
        assert_eq!(frame.width(), 2);
        assert_eq!(frame.height(), 2);
        assert_eq!(frame.channels(), 3);
        assert_eq!(frame.index(), 5);
        assert_eq!(frame.data(), &data[..]);
        assert!(!frame.is_empty());
    }

    #[test]
    fn test_empty_frame() {
        let frame = Frame::empty(7);
        assert!(frame.is_empty());
        assert_eq!(frame.index(), 7);
    }

    #[test]
    fn test_mismatched_data_length_has_no_pixel_view() {
        let frame = Frame::new(vec![0u8; 10], 2, 2, 3, 0); // 2x2x3 needs 12
        assert!(!frame.is_empty());
        assert!(frame.as_ndarray().is_none());
    }

    #[test]
    fn test_as_ndarray_shape() {
        let data = vec![0u8; 32]; // 2x4x4
        let frame = Frame::new(data, 4, 2, 4, 0);
        let arr = frame.as_ndarray().unwrap();
        assert_eq!(arr.shape(), &[2, 4, 4]); // (height, width, channels)
    }

    #[test]
    fn test_as_ndarray_pixel_access_is_bgr() {
        // 2x2 BGR: set pixel (row=1, col=0) to blue
        let mut data = vec![0u8; 12];
        data[6] = 255; // row=1, col=0, B
        let frame = Frame::new(data, 2, 2, 3, 0);
        let arr = frame.as_ndarray().unwrap();
        assert_eq!(arr[[1, 0, 0]], 255); // B
        assert_eq!(arr[[1, 0, 1]], 0); // G
        assert_eq!(arr[[1, 0, 2]], 0); // R
    }
}
