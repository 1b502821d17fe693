use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::sampling::PositionSample;

/// Depth given to joints whose inferred Z comes back negative.
pub const INFERRED_Z_CLAMP: f32 = 0.1;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum JointKind {
    SpineBase,
    SpineMid,
    Neck,
    Head,
    ShoulderLeft,
    ElbowLeft,
    WristLeft,
    HandLeft,
    ShoulderRight,
    ElbowRight,
    WristRight,
    HandRight,
    HipLeft,
    KneeLeft,
    AnkleLeft,
    FootLeft,
    HipRight,
    KneeRight,
    AnkleRight,
    FootRight,
    SpineShoulder,
    HandTipLeft,
    ThumbLeft,
    HandTipRight,
    ThumbRight,
}

/// Camera-space position in meters.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct CameraSpacePoint {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CameraSpacePoint {
    pub fn to_sample(self) -> PositionSample {
        let z = if self.z < 0.0 { INFERRED_Z_CLAMP } else { self.z };
        PositionSample::new(self.x, z)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct TrackedBody {
    pub tracked: bool,
    pub joints: HashMap<JointKind, CameraSpacePoint>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct BodyFrame {
    pub bodies: Vec<TrackedBody>,
}

impl BodyFrame {
    pub fn tracked_count(&self) -> usize {
        self.bodies.iter().filter(|body| body.tracked).count()
    }

    pub fn first_tracked(&self) -> Option<&TrackedBody> {
        self.bodies.iter().find(|body| body.tracked)
    }

    /// Samples for `joints` of the first tracked body, in the order given.
    /// Joints the sensor did not report are skipped.
    pub fn samples_for(&self, joints: &[JointKind]) -> Vec<PositionSample> {
        let Some(body) = self.first_tracked() else {
            return Vec::new();
        };

        joints
            .iter()
            .filter_map(|joint| body.joints.get(joint))
            .map(|point| point.to_sample())
            .collect()
    }
}

/// Raw color frame, 4 bytes per pixel in BGRA order.
#[derive(Debug, Clone, PartialEq)]
pub struct ColorFrame {
    pub width: u32,
    pub height: u32,
    pub bgra: Vec<u8>,
}

impl ColorFrame {
    pub fn is_well_formed(&self) -> bool {
        self.bgra.len() == self.width as usize * self.height as usize * 4
    }
}
