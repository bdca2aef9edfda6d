use env_logger::Env;
use nii_slices::{PipelineConfig, TargetSize, process_single_volume};

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = PipelineConfig::default().with_target_size(TargetSize::square(256));
    let written = process_single_volume("test_data/brain.nii.gz", "test_data/brain", &config)
        .expect("should have sliced test_data/brain.nii.gz");
    log::info!("{} slices ready for translation", written.len());
}
