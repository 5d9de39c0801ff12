//! Device assembly: GPIO drivers with the `hardware` feature, a scripted
//! simulated visitor otherwise.

use dispenser_traits::{Actuator, MotionSensor, RangeSensor, ReviewButtons};

pub struct Rig {
    pub range: Box<dyn RangeSensor>,
    pub motion: Box<dyn MotionSensor>,
    pub actuator: Box<dyn Actuator>,
    pub buttons: Box<dyn ReviewButtons>,
}

#[cfg(feature = "hardware")]
pub fn assemble(cfg: &dispenser_config::Config) -> eyre::Result<Rig> {
    use dispenser_core::map_hw_error;
    use dispenser_hardware::{GpioButtons, GpioServo, HcSr04, PirSensor};
    use eyre::WrapErr;
    use std::time::Duration;

    let hw = |e: dispenser_hardware::error::HwError| eyre::Report::new(map_hw_error(&e));
    let pins = cfg.pins;
    let range = HcSr04::new(
        pins.trig,
        pins.echo,
        Duration::from_millis(cfg.hardware.echo_timeout_ms),
        cfg.hardware.sound_speed_cm_per_us,
    )
    .map_err(hw)
    .wrap_err("open ultrasonic sensor")?;
    let motion = PirSensor::new(pins.pir).map_err(hw).wrap_err("open PIR sensor")?;
    let actuator = GpioServo::new(
        pins.servo,
        Duration::from_micros(cfg.hardware.servo_min_pulse_us),
        Duration::from_micros(cfg.hardware.servo_max_pulse_us),
    )
    .map_err(hw)
    .wrap_err("open servo")?;
    let buttons = GpioButtons::new(pins.button_satisfactory, pins.button_less, pins.button_more)
        .map_err(hw)
        .wrap_err("open review buttons")?;
    tracing::info!(
        pir = pins.pir,
        trig = pins.trig,
        echo = pins.echo,
        servo = pins.servo,
        "GPIO devices ready"
    );
    Ok(Rig {
        range: Box::new(range),
        motion: Box::new(motion),
        actuator: Box::new(actuator),
        buttons: Box::new(buttons),
    })
}

#[cfg(not(feature = "hardware"))]
pub fn assemble(cfg: &dispenser_config::Config) -> eyre::Result<Rig> {
    let (_scene, range, motion, actuator, buttons) =
        dispenser_hardware::simulated_rig(scene_cfg(&cfg.sim));
    tracing::info!("using simulated devices");
    Ok(Rig {
        range: Box::new(range),
        motion: Box::new(motion),
        actuator: Box::new(actuator),
        buttons: Box::new(buttons),
    })
}

#[cfg(not(feature = "hardware"))]
fn scene_cfg(sim: &dispenser_config::Sim) -> dispenser_hardware::SceneCfg {
    use dispenser_config::SimPress;
    use dispenser_traits::ButtonLevels;

    let press = ButtonLevels {
        satisfactory: sim.press == SimPress::Satisfactory,
        less: sim.press == SimPress::Less,
        more: sim.press == SimPress::More,
    };
    dispenser_hardware::SceneCfg {
        arrive_after: sim.arrive_after_reads,
        motion_delay: sim.motion_delay_reads,
        motion_reads: sim.motion_reads,
        near_cm: sim.near_cm,
        far_cm: sim.far_cm,
        press,
    }
}
