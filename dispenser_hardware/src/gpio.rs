use std::time::Duration;

use dispenser_traits::{Actuator, ButtonLevels, DeviceError, MotionSensor, RangeSensor, ReviewButtons};
use rppal::gpio::{Gpio, InputPin, OutputPin};
use tracing::trace;

use crate::error::{HwError, Result};
use crate::util::{SERVO_FRAME, angle_to_pulse, echo_to_cm, measure_high_pulse, spin_for};

fn gpio_err(context: &str, e: rppal::gpio::Error) -> HwError {
    HwError::Gpio(format!("{context}: {e}"))
}

fn open_gpio() -> Result<Gpio> {
    Gpio::new().map_err(|e| gpio_err("open gpio", e))
}

/// HC-SR04 style ultrasonic rangefinder.
pub struct HcSr04 {
    trig: OutputPin,
    echo: InputPin,
    echo_timeout: Duration,
    sound_speed_cm_per_us: f32,
}

impl HcSr04 {
    pub fn new(
        trig_pin: u8,
        echo_pin: u8,
        echo_timeout: Duration,
        sound_speed_cm_per_us: f32,
    ) -> Result<Self> {
        let gpio = open_gpio()?;
        let trig = gpio
            .get(trig_pin)
            .map_err(|e| gpio_err("open trig pin", e))?
            .into_output_low();
        let echo = gpio
            .get(echo_pin)
            .map_err(|e| gpio_err("open echo pin", e))?
            .into_input();
        Ok(Self {
            trig,
            echo,
            echo_timeout,
            sound_speed_cm_per_us,
        })
    }

    fn trigger(&mut self) {
        self.trig.set_low();
        spin_for(Duration::from_micros(2));
        self.trig.set_high();
        spin_for(Duration::from_micros(10));
        self.trig.set_low();
    }
}

impl RangeSensor for HcSr04 {
    fn distance_cm(&mut self) -> std::result::Result<f32, DeviceError> {
        self.trigger();
        let echo = &self.echo;
        match measure_high_pulse(|| echo.is_high(), self.echo_timeout, Duration::ZERO) {
            Ok(width) => {
                let cm = echo_to_cm(width, self.sound_speed_cm_per_us);
                trace!(width_us = width.as_micros() as u64, distance_cm = cm, "echo");
                Ok(cm)
            }
            // Nothing in range: reads as infinitely far rather than as an error.
            Err(HwError::EchoTimeout) => {
                trace!("echo timeout");
                Ok(f32::INFINITY)
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// PIR motion sensor output, active-high.
pub struct PirSensor {
    pin: InputPin,
}

impl PirSensor {
    pub fn new(pin: u8) -> Result<Self> {
        let pin = open_gpio()?
            .get(pin)
            .map_err(|e| gpio_err("open pir pin", e))?
            .into_input();
        Ok(Self { pin })
    }
}

impl MotionSensor for PirSensor {
    fn is_active(&mut self) -> std::result::Result<bool, DeviceError> {
        Ok(self.pin.is_high())
    }
}

/// Hobby servo on software PWM.
pub struct GpioServo {
    pin: OutputPin,
    min_pulse: Duration,
    max_pulse: Duration,
}

impl GpioServo {
    pub fn new(pin: u8, min_pulse: Duration, max_pulse: Duration) -> Result<Self> {
        let pin = open_gpio()?
            .get(pin)
            .map_err(|e| gpio_err("open servo pin", e))?
            .into_output_low();
        Ok(Self {
            pin,
            min_pulse,
            max_pulse,
        })
    }
}

impl Actuator for GpioServo {
    fn set_angle(&mut self, degrees: f32) -> std::result::Result<(), DeviceError> {
        let pulse = angle_to_pulse(degrees, self.min_pulse, self.max_pulse)?;
        trace!(angle_deg = degrees, pulse_us = pulse.as_micros() as u64, "servo pwm");
        self.pin
            .set_pwm(SERVO_FRAME, pulse)
            .map_err(|e| Box::new(gpio_err("servo pwm", e)) as DeviceError)
    }
}

/// Three review buttons wired to ground with internal pull-ups (pressed = low).
pub struct GpioButtons {
    satisfactory: InputPin,
    less: InputPin,
    more: InputPin,
}

impl GpioButtons {
    pub fn new(satisfactory: u8, less: u8, more: u8) -> Result<Self> {
        let gpio = open_gpio()?;
        let open = |pin: u8| -> Result<InputPin> {
            Ok(gpio
                .get(pin)
                .map_err(|e| gpio_err("open button pin", e))?
                .into_input_pullup())
        };
        Ok(Self {
            satisfactory: open(satisfactory)?,
            less: open(less)?,
            more: open(more)?,
        })
    }
}

impl ReviewButtons for GpioButtons {
    fn read(&mut self) -> std::result::Result<ButtonLevels, DeviceError> {
        Ok(ButtonLevels {
            satisfactory: self.satisfactory.is_low(),
            less: self.less.is_low(),
            more: self.more.is_low(),
        })
    }
}
