pub mod face_locator;
pub mod identity_tracker;
