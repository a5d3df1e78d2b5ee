pub mod shared {
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
    pub mod pixel_rect;
}

pub mod preprocessing {
    pub mod frame_preprocessor;
}

pub mod detection {
    pub mod domain {
        pub mod candidate_detector;
        pub mod detector_loader;
        pub mod estimate_smoother;
        pub mod face_estimate;
        pub mod face_locator;
        pub mod landmark_estimator;
    }
    pub mod infrastructure;
}

pub mod tracking {
    pub mod face_tracker;
    pub mod tracker_config;
    pub mod tracker_state;
    pub mod tracking_logger;
    pub mod tracking_worker;
}

#[cfg(test)]
mod testing;
