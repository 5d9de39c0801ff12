//! Simulated devices driven by a shared, scripted visitor.
//!
//! All four devices observe one `SimScene`. A visitor walks up after
//! `arrive_after` far readings, the PIR line goes high for `motion_reads`
//! polls (after `motion_delay` low polls), the hand is withdrawn, and the
//! configured button is pressed during the review. The next visitor then
//! starts over.

use std::cell::RefCell;
use std::rc::Rc;

use dispenser_traits::{Actuator, ButtonLevels, DeviceError, MotionSensor, RangeSensor, ReviewButtons};
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct SceneCfg {
    /// Far readings before the hand appears.
    pub arrive_after: u32,
    /// PIR polls that stay low once the hand is present.
    pub motion_delay: u32,
    /// PIR polls that read high (the gesture).
    pub motion_reads: u32,
    pub near_cm: f32,
    pub far_cm: f32,
    /// Button held down during the review.
    pub press: ButtonLevels,
}

impl Default for SceneCfg {
    fn default() -> Self {
        Self {
            arrive_after: 10,
            motion_delay: 2,
            motion_reads: 5,
            near_cm: 8.0,
            far_cm: 60.0,
            press: ButtonLevels {
                satisfactory: true,
                ..ButtonLevels::default()
            },
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum Phase {
    #[default]
    Away,
    Present,
    Withdrawn,
}

#[derive(Debug)]
pub struct SimScene {
    cfg: SceneCfg,
    phase: Phase,
    far_reads: u32,
    pir_reads: u32,
    visitors: u32,
    last_angle: f32,
}

pub type SharedScene = Rc<RefCell<SimScene>>;

impl SimScene {
    pub fn new(cfg: SceneCfg) -> Self {
        Self {
            cfg,
            phase: Phase::Away,
            far_reads: 0,
            pir_reads: 0,
            visitors: 0,
            last_angle: 0.0,
        }
    }

    pub fn shared(cfg: SceneCfg) -> SharedScene {
        Rc::new(RefCell::new(Self::new(cfg)))
    }

    /// Visitors that completed a review so far.
    pub fn visitors(&self) -> u32 {
        self.visitors
    }

    pub fn last_angle(&self) -> f32 {
        self.last_angle
    }

    fn distance(&mut self) -> f32 {
        match self.phase {
            Phase::Present => self.cfg.near_cm,
            Phase::Withdrawn => self.cfg.far_cm,
            Phase::Away => {
                self.far_reads = self.far_reads.saturating_add(1);
                if self.far_reads > self.cfg.arrive_after {
                    debug!(visitor = self.visitors + 1, "simulated hand arrives");
                    self.phase = Phase::Present;
                    self.cfg.near_cm
                } else {
                    self.cfg.far_cm
                }
            }
        }
    }

    fn motion(&mut self) -> bool {
        if self.phase != Phase::Present {
            return false;
        }
        self.pir_reads = self.pir_reads.saturating_add(1);
        let high_until = self.cfg.motion_delay.saturating_add(self.cfg.motion_reads);
        if self.pir_reads > high_until {
            debug!("simulated hand withdrawn");
            self.phase = Phase::Withdrawn;
            return false;
        }
        self.pir_reads > self.cfg.motion_delay
    }

    fn buttons(&mut self) -> ButtonLevels {
        if self.phase != Phase::Withdrawn {
            return ButtonLevels::default();
        }
        self.visitors = self.visitors.saturating_add(1);
        self.phase = Phase::Away;
        self.far_reads = 0;
        self.pir_reads = 0;
        self.cfg.press
    }
}

pub struct SimulatedRangeSensor {
    scene: SharedScene,
}

impl SimulatedRangeSensor {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }
}

impl RangeSensor for SimulatedRangeSensor {
    fn distance_cm(&mut self) -> Result<f32, DeviceError> {
        Ok(self.scene.borrow_mut().distance())
    }
}

pub struct SimulatedMotionSensor {
    scene: SharedScene,
}

impl SimulatedMotionSensor {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }
}

impl MotionSensor for SimulatedMotionSensor {
    fn is_active(&mut self) -> Result<bool, DeviceError> {
        Ok(self.scene.borrow_mut().motion())
    }
}

pub struct SimulatedServo {
    scene: SharedScene,
}

impl SimulatedServo {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }
}

impl Actuator for SimulatedServo {
    fn set_angle(&mut self, degrees: f32) -> Result<(), DeviceError> {
        debug!(angle_deg = degrees, "servo (simulated)");
        self.scene.borrow_mut().last_angle = degrees;
        Ok(())
    }
}

pub struct SimulatedButtons {
    scene: SharedScene,
}

impl SimulatedButtons {
    pub fn new(scene: SharedScene) -> Self {
        Self { scene }
    }
}

impl ReviewButtons for SimulatedButtons {
    fn read(&mut self) -> Result<ButtonLevels, DeviceError> {
        Ok(self.scene.borrow_mut().buttons())
    }
}

/// The four simulated devices wired to one fresh scene.
pub fn simulated_rig(
    cfg: SceneCfg,
) -> (
    SharedScene,
    SimulatedRangeSensor,
    SimulatedMotionSensor,
    SimulatedServo,
    SimulatedButtons,
) {
    let scene = SimScene::shared(cfg);
    (
        scene.clone(),
        SimulatedRangeSensor::new(scene.clone()),
        SimulatedMotionSensor::new(scene.clone()),
        SimulatedServo::new(scene.clone()),
        SimulatedButtons::new(scene),
    )
}
