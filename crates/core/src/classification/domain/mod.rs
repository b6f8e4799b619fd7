pub mod face_region;
pub mod mask_classifier;
pub mod region_extractor;
pub mod stabilization_cache;
pub mod verdict;
