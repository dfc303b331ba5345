//! YuNet face detector backend.
//!
//! YuNet is anchor-free. For each stride (8, 16, 32) it outputs, over an
//! `(input / stride)^2` grid:
//! - cls: [1, H*W, 1] classification scores
//! - obj: [1, H*W, 1] objectness scores
//! - bbox: [1, H*W, 4] deltas (dx, dy, dw, dh)
//! - kps: [1, H*W, 10] landmark deltas (unused here)
//!
//! Output order: cls_8, cls_16, cls_32, obj_8, ..., bbox_8, ..., kps_8, ...
//!
//! Decoding per grid cell (row, col):
//! cx = (col + dx) * stride, w = exp(dw) * stride, score = sqrt(cls * obj)

use std::path::Path;

use anyhow::Result;
use image::{imageops, imageops::FilterType, GrayImage};
use ndarray::{Array2, Array4};
use ort::{session::Session, value::Value};

use crate::detector::FaceDetector;
use crate::geometry::Rect;
use crate::model;

const STRIDES: [usize; 3] = [8, 16, 32];

/// Side of the square network input.
pub const INPUT_SIZE: usize = 640;

/// A decoded box in network input pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub bbox: [f32; 4], // x, y, w, h
    pub score: f32,
}

/// Per-stride tensors, `H*W` rows each.
pub struct StrideOutput {
    pub cls: Array2<f32>,
    pub obj: Array2<f32>,
    pub bbox: Array2<f32>,
}

/// Split raw `(shape, data)` outputs into per-stride tensors.
pub fn parse_outputs(outputs: &[(&[i64], &[f32])], input_size: usize) -> Result<Vec<StrideOutput>> {
    if outputs.len() < STRIDES.len() * 3 {
        anyhow::bail!(
            "Expected at least {} YuNet outputs, got {}",
            STRIDES.len() * 3,
            outputs.len()
        );
    }

    let tensor = |index: usize, cols: usize, cells: usize| -> Result<Array2<f32>> {
        let (shape, data) = outputs[index];
        if shape.len() != 3 || shape[0] != 1 || shape[1] as usize != cells || shape[2] as usize != cols
        {
            anyhow::bail!(
                "Unexpected shape at output {}: {:?}, expected [1, {}, {}]",
                index,
                shape,
                cells,
                cols
            );
        }
        Ok(Array2::from_shape_vec((cells, cols), data.to_vec())?)
    };

    STRIDES
        .iter()
        .enumerate()
        .map(|(i, &stride)| {
            let side = input_size / stride;
            let cells = side * side;
            Ok(StrideOutput {
                cls: tensor(i, 1, cells)?,
                obj: tensor(i + STRIDES.len(), 1, cells)?,
                bbox: tensor(i + STRIDES.len() * 2, 4, cells)?,
            })
        })
        .collect()
}

/// Decode every grid cell scoring at least `score_threshold`.
pub fn decode(outputs: &[StrideOutput], score_threshold: f32, input_size: usize) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    for (out, &stride) in outputs.iter().zip(STRIDES.iter()) {
        let side = input_size / stride;
        let stride = stride as f32;
        for row in 0..side {
            for col in 0..side {
                let idx = row * side + col;
                let cls = out.cls[[idx, 0]].clamp(0.0, 1.0);
                let obj = out.obj[[idx, 0]].clamp(0.0, 1.0);
                let score = (cls * obj).sqrt();
                if !score.is_finite() || score < score_threshold {
                    continue;
                }

                let cx = (col as f32 + out.bbox[[idx, 0]]) * stride;
                let cy = (row as f32 + out.bbox[[idx, 1]]) * stride;
                let w = out.bbox[[idx, 2]].exp() * stride;
                let h = out.bbox[[idx, 3]].exp() * stride;
                candidates.push(Candidate {
                    bbox: [cx - w / 2.0, cy - h / 2.0, w, h],
                    score,
                });
            }
        }
    }
    candidates
}

/// Greedy non-maximum suppression, highest score first.
pub fn nms(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut keep: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for c in candidates {
        if keep.iter().all(|k| iou(&k.bbox, &c.bbox) <= iou_threshold) {
            keep.push(c);
        }
    }
    keep
}

fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let x1 = a[0].max(b[0]);
    let y1 = a[1].max(b[1]);
    let x2 = (a[0] + a[2]).min(b[0] + b[2]);
    let y2 = (a[1] + a[3]).min(b[1] + b[3]);

    if x2 <= x1 || y2 <= y1 {
        return 0.0;
    }

    let inter = (x2 - x1) * (y2 - y1);
    inter / (a[2] * a[3] + b[2] * b[3] - inter)
}

/// Placement of the source image inside the square network input.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    scale: f32,
    offset_x: u32,
    offset_y: u32,
}

impl Letterbox {
    fn new(width: u32, height: u32, target: u32) -> Self {
        let scale = target as f32 / width.max(height) as f32;
        let new_w = (width as f32 * scale) as u32;
        let new_h = (height as f32 * scale) as u32;
        Self {
            scale,
            offset_x: (target - new_w) / 2,
            offset_y: (target - new_h) / 2,
        }
    }

    /// Map a box from network input pixels back to source pixels.
    fn unmap(&self, bbox: &[f32; 4]) -> Rect {
        let x = (bbox[0] - self.offset_x as f32) / self.scale;
        let y = (bbox[1] - self.offset_y as f32) / self.scale;
        Rect::new(
            x.round() as i32,
            y.round() as i32,
            (bbox[2] / self.scale).round() as i32,
            (bbox[3] / self.scale).round() as i32,
        )
    }
}

/// [`FaceDetector`] backed by a YuNet ONNX model.
pub struct YuNetDetector {
    session: Session,
    score_threshold: f32,
    nms_threshold: f32,
}

impl YuNetDetector {
    pub fn new(session: Session, score_threshold: f32, nms_threshold: f32) -> Self {
        Self {
            session,
            score_threshold,
            nms_threshold,
        }
    }

    pub fn from_file(path: &Path, score_threshold: f32, nms_threshold: f32) -> Result<Self> {
        let session = model::detector_session(path)?;
        Ok(Self::new(session, score_threshold, nms_threshold))
    }

    fn input_tensor(gray: &GrayImage, letterbox: &Letterbox) -> Result<Array4<f32>> {
        let target = INPUT_SIZE as u32;
        let new_w = ((gray.width() as f32 * letterbox.scale) as u32).max(1);
        let new_h = ((gray.height() as f32 * letterbox.scale) as u32).max(1);
        let resized = imageops::resize(gray, new_w, new_h, FilterType::Triangle);
        let mut canvas = GrayImage::new(target, target);
        imageops::overlay(
            &mut canvas,
            &resized,
            i64::from(letterbox.offset_x),
            i64::from(letterbox.offset_y),
        );

        // Gray into all three BGR planes.
        let plane: Vec<f32> = canvas.as_raw().iter().map(|&v| f32::from(v)).collect();
        let mut data = Vec::with_capacity(plane.len() * 3);
        for _ in 0..3 {
            data.extend_from_slice(&plane);
        }
        Ok(Array4::from_shape_vec(
            (1, 3, INPUT_SIZE, INPUT_SIZE),
            data,
        )?)
    }
}

impl FaceDetector for YuNetDetector {
    fn detect(&mut self, gray: &GrayImage) -> Result<Vec<Rect>> {
        let (width, height) = gray.dimensions();
        if width == 0 || height == 0 {
            return Ok(vec![]);
        }
        let letterbox = Letterbox::new(width, height, INPUT_SIZE as u32);
        let input = Value::from_array(Self::input_tensor(gray, &letterbox)?)?;

        let outputs = self.session.run(ort::inputs![input])?;
        let mut output_data: Vec<(Vec<i64>, Vec<f32>)> = Vec::new();
        for (_name, output) in outputs.iter() {
            let (shape, data) = output.try_extract_tensor::<f32>()?;
            output_data.push((shape.iter().copied().collect(), data.to_vec()));
        }
        let output_refs: Vec<(&[i64], &[f32])> = output_data
            .iter()
            .map(|(s, d)| (s.as_slice(), d.as_slice()))
            .collect();

        let strides = parse_outputs(&output_refs, INPUT_SIZE)?;
        let candidates = nms(
            decode(&strides, self.score_threshold, INPUT_SIZE),
            self.nms_threshold,
        );
        log::trace!("yunet: {} face(s) in {}x{}", candidates.len(), width, height);
        Ok(candidates.iter().map(|c| letterbox.unmap(&c.bbox)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_outputs(input_size: usize) -> Vec<StrideOutput> {
        STRIDES
            .iter()
            .map(|&stride| {
                let cells = (input_size / stride).pow(2);
                StrideOutput {
                    cls: Array2::zeros((cells, 1)),
                    obj: Array2::zeros((cells, 1)),
                    bbox: Array2::zeros((cells, 4)),
                }
            })
            .collect()
    }

    #[test]
    fn test_decode_single_cell() {
        let mut outputs = empty_outputs(640);
        // Stride 32, 20x20 grid, cell (row 10, col 10).
        let idx = 10 * 20 + 10;
        outputs[2].cls[[idx, 0]] = 0.81;
        outputs[2].obj[[idx, 0]] = 1.0;
        outputs[2].bbox[[idx, 0]] = 0.5;
        outputs[2].bbox[[idx, 1]] = 0.25;
        outputs[2].bbox[[idx, 2]] = 4f32.ln();
        outputs[2].bbox[[idx, 3]] = 2f32.ln();

        let found = decode(&outputs, 0.5, 640);
        assert_eq!(found.len(), 1);
        let c = found[0];
        assert!((c.score - 0.9).abs() < 1e-5);
        // cx = 10.5 * 32 = 336, w = 4 * 32 = 128
        assert!((c.bbox[0] - 272.0).abs() < 1e-3);
        // cy = 10.25 * 32 = 328, h = 2 * 32 = 64
        assert!((c.bbox[1] - 296.0).abs() < 1e-3);
        assert!((c.bbox[2] - 128.0).abs() < 1e-3);
        assert!((c.bbox[3] - 64.0).abs() < 1e-3);
    }

    #[test]
    fn test_parse_rejects_bad_shape() {
        let cells = 80 * 80;
        let data = vec![0.0f32; cells * 4];
        let shape: [i64; 3] = [1, cells as i64, 2];
        let outputs = vec![(&shape[..], &data[..]); 9];
        assert!(parse_outputs(&outputs, 640).is_err());
    }

    #[test]
    fn test_nms_keeps_best() {
        let a = Candidate {
            bbox: [0.0, 0.0, 10.0, 10.0],
            score: 0.7,
        };
        let b = Candidate {
            bbox: [1.0, 1.0, 10.0, 10.0],
            score: 0.9,
        };
        let c = Candidate {
            bbox: [50.0, 50.0, 10.0, 10.0],
            score: 0.8,
        };
        let kept = nms(vec![a, b, c], 0.3);
        assert_eq!(kept, vec![b, c]);
    }

    #[test]
    fn test_letterbox_roundtrip() {
        let lb = Letterbox::new(320, 160, 640);
        assert_eq!(lb.scale, 2.0);
        assert_eq!((lb.offset_x, lb.offset_y), (0, 160));
        let r = lb.unmap(&[40.0, 200.0, 60.0, 80.0]);
        assert_eq!(r, Rect::new(20, 20, 30, 40));
    }
}
