use crate::error::Error;
use ndarray::Array2;
use num_traits::ToPrimitive;

/// Joints of the Leeds Sports Pose layout, in the order the network emits them.
#[derive(Debug, Copy, Clone, PartialEq, Eq, num_derive::FromPrimitive, num_derive::ToPrimitive)]
pub(crate) enum KeypointKind {
    RightAnkle,
    RightKnee,
    RightHip,
    LeftHip,
    LeftKnee,
    LeftAnkle,
    RightWrist,
    RightElbow,
    RightShoulder,
    LeftShoulder,
    LeftElbow,
    LeftWrist,
    Neck,
    HeadTop,
}

impl KeypointKind {
    pub(crate) fn idx(self) -> Result<usize, Error> {
        self.to_usize().ok_or(Error::KeypointVariantToUSize(self))
    }
}

pub(crate) const NUM_KEYPOINTS: usize = 14;

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Keypoint {
    pub(crate) kind: KeypointKind,
    pub(crate) point: opencv::core::Point,
    pub(crate) score: f32,
}

pub(crate) type Keypoints = [Keypoint; NUM_KEYPOINTS];

#[derive(Debug, Copy, Clone, PartialEq)]
pub(crate) struct Pose {
    pub(crate) keypoints: Keypoints,
}

impl Pose {
    pub(crate) fn points(&self) -> Vec<opencv::core::Point> {
        self.keypoints.iter().map(|keypoint| keypoint.point).collect()
    }

    /// Rows are x, y and confidence; one column per joint.
    pub(crate) fn to_joint_array(&self) -> Result<Array2<f64>, Error> {
        let mut joints = Array2::zeros((3, NUM_KEYPOINTS));
        for (i, &Keypoint { point, score, .. }) in self.keypoints.iter().enumerate() {
            joints[(0, i)] = f64::from(point.x);
            joints[(1, i)] = f64::from(point.y);
            joints[(2, i)] = score.to_f64().ok_or(Error::ConvertToF64)?;
        }
        Ok(joints)
    }
}

pub(crate) mod constants {
    use crate::pose::KeypointKind::{self, *};

    pub(crate) const LIMBS: [(KeypointKind, KeypointKind); 13] = [
        (HeadTop, Neck),
        (Neck, LeftShoulder),
        (Neck, RightShoulder),
        (LeftShoulder, LeftElbow),
        (RightShoulder, RightElbow),
        (LeftElbow, LeftWrist),
        (RightElbow, RightWrist),
        (Neck, LeftHip),
        (Neck, RightHip),
        (RightHip, RightKnee),
        (RightKnee, RightAnkle),
        (LeftHip, LeftKnee),
        (LeftKnee, LeftAnkle),
    ];

    // channel triples are handed to OpenCV as-is, so they read as BGR
    pub(crate) const LIMB_COLORS: [(f64, f64, f64); 13] = [
        (255.0, 0.0, 0.0),
        (255.0, 85.0, 0.0),
        (255.0, 170.0, 0.0),
        (255.0, 255.0, 0.0),
        (170.0, 255.0, 0.0),
        (85.0, 255.0, 0.0),
        (0.0, 255.0, 0.0),
        (0.0, 255.0, 85.0),
        (0.0, 255.0, 170.0),
        (0.0, 255.0, 255.0),
        (0.0, 170.0, 255.0),
        (0.0, 85.0, 255.0),
        (0.0, 0.0, 255.0),
    ];

    pub(crate) const JOINT_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);
}

/// Resolve the named limb list into keypoint index pairs.
pub(crate) fn limb_indices() -> Result<Vec<(usize, usize)>, Error> {
    constants::LIMBS
        .iter()
        .map(|&(a, b)| Ok((a.idx()?, b.idx()?)))
        .collect()
}
