#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;

use dispenser_core::{DispenseCfg, convert_to_angle, extra_step_angles};

#[derive(Debug, Arbitrary)]
struct Input {
    inches: f32,
    degrees_per_inch: f32,
    max_angle: u8,
    step: u8,
}

fuzz_target!(|input: Input| {
    let max_angle_deg = f32::from(input.max_angle.clamp(1, 180));
    let cfg = DispenseCfg {
        degrees_per_inch: input.degrees_per_inch,
        max_angle_deg,
        ..DispenseCfg::default()
    };
    let angle = convert_to_angle(input.inches, &cfg);
    assert!((0.0..=max_angle_deg).contains(&angle), "angle {angle} out of travel");

    let step = f32::from(input.step.max(1));
    let steps: Vec<f32> = extra_step_angles(step, max_angle_deg).collect();
    assert!(!steps.is_empty());
    assert!(steps.iter().all(|a| *a <= max_angle_deg));
});
