use crate::error::Error;
use num_traits::ToPrimitive;
use opencv::{
    core::{Mat, Point, Scalar, Size, Vector},
    imgproc::{FILLED, LINE_8},
    prelude::*,
};
use std::path::Path;

const JOINT_RADIUS: i32 = 1;
const LIMB_WIDTH: i32 = 4;
const LIMB_ALPHA: f64 = 0.6;

/// Bone topology and one color per bone.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Skeleton<'a> {
    pub(crate) limbs: &'a [(usize, usize)],
    pub(crate) colors: &'a [(f64, f64, f64)],
    pub(crate) joint_color: (f64, f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Capsule {
    center: Point,
    half_length: i32,
    angle: i32,
}

/// Geometry of the capsule drawn between two joints.
///
/// Each keypoint is unpacked as `[y, x]` even though it is stored as `(x, y)`.
/// Both the midpoint and the angle are built from the swapped pair and the
/// center is swapped back, so the capsule still lies along the bone.
fn capsule(a: Point, b: Point) -> Result<Capsule, Error> {
    let (y0, x0) = (f64::from(a.x), f64::from(a.y));
    let (y1, x1) = (f64::from(b.x), f64::from(b.y));
    let mean_x = (x0 + x1) / 2.0;
    let mean_y = (y0 + y1) / 2.0;
    let length = ((x0 - x1).powi(2) + (y0 - y1).powi(2)).sqrt();
    let angle = (x0 - x1).atan2(y0 - y1) / (std::f64::consts::PI / 180.0);
    Ok(Capsule {
        center: Point::new(
            mean_y.trunc().to_i32().ok_or(Error::ConvertToI32)?,
            mean_x.trunc().to_i32().ok_or(Error::ConvertToI32)?,
        ),
        half_length: (length / 2.0).trunc().to_i32().ok_or(Error::ConvertToI32)?,
        angle: angle.trunc().to_i32().ok_or(Error::ConvertToI32)?,
    })
}

fn capsule_polygon(capsule: Capsule) -> Result<Vector<Point>, Error> {
    let mut polygon = Vector::new();
    opencv::imgproc::ellipse_2_poly(
        capsule.center,
        Size::new(capsule.half_length, LIMB_WIDTH),
        capsule.angle,
        0,   // arc_start
        360, // arc_end
        1,   // delta
        &mut polygon,
    )
    .map_err(Error::EllipsePoly)?;
    Ok(polygon)
}

/// Draw joints and translucent limbs over a copy of `image`.
///
/// `points` are in keypoint order; `image` is left untouched.
pub(crate) fn overlay(image: &Mat, points: &[Point], skeleton: Skeleton) -> Result<Mat, Error> {
    if skeleton.colors.len() < skeleton.limbs.len() {
        return Err(Error::Palette(skeleton.colors.len(), skeleton.limbs.len()));
    }

    let mut canvas = image.try_clone().map_err(Error::CloneMat)?;

    for &point in points {
        opencv::imgproc::circle(
            &mut canvas,
            point,
            JOINT_RADIUS,
            Scalar::from(skeleton.joint_color),
            FILLED, // thickness
            LINE_8, // line_type
            0,      // shift
        )
        .map_err(Error::DrawCircle)?;
    }

    for (&(a, b), &color) in skeleton.limbs.iter().zip(skeleton.colors) {
        let a = *points.get(a).ok_or(Error::LimbIndex(a, points.len()))?;
        let b = *points.get(b).ok_or(Error::LimbIndex(b, points.len()))?;
        let polygon = capsule_polygon(capsule(a, b)?)?;

        let mut layer = canvas.try_clone().map_err(Error::CloneMat)?;
        opencv::imgproc::fill_convex_poly(&mut layer, &polygon, Scalar::from(color), LINE_8, 0)
            .map_err(Error::FillPoly)?;

        let mut blended = Mat::default();
        opencv::core::add_weighted(
            &canvas,
            1.0 - LIMB_ALPHA,
            &layer,
            LIMB_ALPHA,
            0.0, // gamma
            &mut blended,
            -1, // dtype
        )
        .map_err(Error::AddWeighted)?;
        canvas = blended;
    }

    Ok(canvas)
}

/// Write `image` to `path`; the format follows the file extension.
pub(crate) fn persist<P>(image: &Mat, path: P) -> Result<(), Error>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let filename = path
        .to_str()
        .ok_or_else(|| Error::NonUtf8Path(path.to_path_buf()))?;
    if opencv::imgcodecs::imwrite(filename, image, &Vector::new())
        .map_err(|e| Error::WriteImage(e, path.to_path_buf()))?
    {
        Ok(())
    } else {
        Err(Error::ImageNotWritten(path.to_path_buf()))
    }
}

pub(crate) const WINDOW_NAME: &str = "test_example";

/// Show `image` and block until a key is pressed.
#[cfg(feature = "gui")]
pub(crate) fn display(image: &Mat) -> Result<(), Error> {
    opencv::highgui::imshow(WINDOW_NAME, image).map_err(Error::ImShow)?;
    opencv::highgui::wait_key(0).map_err(Error::WaitKey)?;
    Ok(())
}

#[cfg(not(feature = "gui"))]
pub(crate) fn display(_image: &Mat) -> Result<(), Error> {
    tracing::warn!(
        message = "built without the gui feature, not displaying",
        window = WINDOW_NAME
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opencv::core::{Vec3b, CV_8UC3};

    const WHITE: (f64, f64, f64) = (255.0, 255.0, 255.0);
    const GREEN: (f64, f64, f64) = (0.0, 255.0, 0.0);

    fn gray(rows: i32, cols: i32) -> Mat {
        Mat::new_rows_cols_with_default(rows, cols, CV_8UC3, Scalar::all(50.0)).unwrap()
    }

    fn pixel(image: &Mat, row: i32, col: i32) -> [u8; 3] {
        let value = image.at_2d::<Vec3b>(row, col).unwrap();
        [value[0], value[1], value[2]]
    }

    mod capsule_tests {
        use super::*;

        #[test]
        fn diagonal_bone() {
            let capsule = capsule(Point::new(0, 0), Point::new(10, 10)).unwrap();
            assert_eq!(capsule.center, Point::new(5, 5));
            assert_eq!(capsule.half_length, 7);
            // atan2(-10, -10) = -135 degrees
            assert_eq!(capsule.angle, -135);
        }

        #[test]
        fn horizontal_bone() {
            let capsule = capsule(Point::new(2, 8), Point::new(12, 8)).unwrap();
            assert_eq!(capsule.center, Point::new(7, 8));
            assert_eq!(capsule.half_length, 5);
            assert_eq!(capsule.angle, 180);
        }

        #[test]
        fn vertical_bone() {
            let capsule = capsule(Point::new(4, 20), Point::new(4, 3)).unwrap();
            assert_eq!(capsule.center, Point::new(4, 11));
            assert_eq!(capsule.half_length, 8);
            assert_eq!(capsule.angle, 90);
        }

        #[test]
        fn polygon_closes_around_center() {
            let polygon = capsule_polygon(capsule(Point::new(0, 0), Point::new(10, 10)).unwrap())
                .unwrap();
            assert!(polygon.len() > 4);
            let (min_x, max_x) = polygon
                .iter()
                .fold((i32::MAX, i32::MIN), |(lo, hi), p| (lo.min(p.x), hi.max(p.x)));
            assert!(min_x <= 1 && max_x >= 9);
        }
    }

    #[test]
    fn single_limb_only_touches_its_capsule() {
        let image = gray(32, 32);
        let points = [Point::new(0, 0), Point::new(10, 10)];
        let limbs = [(0, 1)];
        let colors = [GREEN];
        let skeleton = Skeleton {
            limbs: &limbs,
            colors: &colors,
            joint_color: WHITE,
        };

        let out = overlay(&image, &points, skeleton).unwrap();

        let polygon = capsule_polygon(capsule(points[0], points[1]).unwrap()).unwrap();
        let bounds = polygon.iter().chain(points.iter().flat_map(|&p| {
            vec![
                Point::new(p.x - JOINT_RADIUS, p.y - JOINT_RADIUS),
                Point::new(p.x + JOINT_RADIUS, p.y + JOINT_RADIUS),
            ]
        }));
        let (min_x, min_y, max_x, max_y) = bounds.fold(
            (i32::MAX, i32::MAX, i32::MIN, i32::MIN),
            |(x0, y0, x1, y1), p| (x0.min(p.x), y0.min(p.y), x1.max(p.x), y1.max(p.y)),
        );

        let mut changed = 0;
        for row in 0..32 {
            for col in 0..32 {
                let inside = (min_x..=max_x).contains(&col) && (min_y..=max_y).contains(&row);
                if pixel(&out, row, col) != pixel(&image, row, col) {
                    assert!(inside, "pixel ({}, {}) changed outside the capsule", col, row);
                    changed += 1;
                }
            }
        }
        assert!(changed > 0);
        // the capsule midpoint is blended toward green
        let mid = pixel(&out, 5, 5);
        assert!(mid[1] > 50);
    }

    #[test]
    fn input_is_left_untouched() {
        let image = gray(16, 16);
        let points = [Point::new(3, 3), Point::new(12, 12)];
        let limbs = [(0, 1)];
        let colors = [GREEN];
        let skeleton = Skeleton {
            limbs: &limbs,
            colors: &colors,
            joint_color: WHITE,
        };
        overlay(&image, &points, skeleton).unwrap();
        for row in 0..16 {
            for col in 0..16 {
                assert_eq!(pixel(&image, row, col), [50, 50, 50]);
            }
        }
    }

    #[test]
    fn joints_are_drawn_opaque_without_limbs() {
        let image = gray(16, 16);
        let points = [Point::new(8, 4)];
        let skeleton = Skeleton {
            limbs: &[],
            colors: &[],
            joint_color: WHITE,
        };
        let out = overlay(&image, &points, skeleton).unwrap();
        assert_eq!(pixel(&out, 4, 8), [255, 255, 255]);
        assert_eq!(pixel(&out, 12, 12), [50, 50, 50]);
    }

    #[test]
    fn limb_is_translucent() {
        let image = gray(16, 16);
        let points = [Point::new(2, 8), Point::new(13, 8)];
        let limbs = [(0, 1)];
        let colors = [GREEN];
        let skeleton = Skeleton {
            limbs: &limbs,
            colors: &colors,
            joint_color: WHITE,
        };
        let out = overlay(&image, &points, skeleton).unwrap();
        // 0.4 * 50 + 0.6 * {0, 255, 0}
        assert_eq!(pixel(&out, 8, 7), [20, 173, 20]);
    }

    #[test]
    fn limb_index_out_of_range() {
        let image = gray(8, 8);
        let points = [Point::new(1, 1)];
        let limbs = [(0, 3)];
        let colors = [GREEN];
        let skeleton = Skeleton {
            limbs: &limbs,
            colors: &colors,
            joint_color: WHITE,
        };
        assert!(matches!(
            overlay(&image, &points, skeleton),
            Err(Error::LimbIndex(3, 1))
        ));
    }

    #[test]
    fn short_palette() {
        let image = gray(8, 8);
        let limbs = [(0, 0), (0, 0)];
        let colors = [GREEN];
        let skeleton = Skeleton {
            limbs: &limbs,
            colors: &colors,
            joint_color: WHITE,
        };
        assert!(matches!(
            overlay(&image, &[Point::new(1, 1)], skeleton),
            Err(Error::Palette(1, 2))
        ));
    }

    #[test]
    fn persist_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("overlay.png");
        let image = gray(6, 9);
        persist(&image, &path).unwrap();
        let read =
            opencv::imgcodecs::imread(path.to_str().unwrap(), opencv::imgcodecs::IMREAD_COLOR)
                .unwrap();
        assert_eq!(read.rows(), 6);
        assert_eq!(read.cols(), 9);
        assert_eq!(pixel(&read, 3, 4), [50, 50, 50]);
    }
}
