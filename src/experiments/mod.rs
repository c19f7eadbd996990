// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Offline coefficient experiments

The noise-scaling and power-balancing entries of the coefficient table are
fitted from real scenes with the procedures in this module. They sample
calibrated sigma nought around the range-noise vectors, fit the scaling of
each noise line and the power steps between neighbouring subswaths, and
persist the fit arrays as gzipped JSON. Nothing here runs in the
denoising path.
*/

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use ndarray::Array2;
use serde::Serialize;

use crate::denoise::VectorSet;
use crate::error::S1Error;
use crate::interp::clamped_interp;
use crate::measurement;
use crate::product::{Polarization, Sentinel1Product};
use crate::raster::{nanmean, nanstd};
use crate::swath::SwathId;

/// Azimuth averaging window (lines) of the experiment sampling.
pub const AVERAGE_LINES: usize = 777;

/// Range zoom step of the experiment pixel axes.
pub const ZOOM_STEP: i32 = 2;

/// Pixels compared on each side of a subswath boundary by the range
/// quality metric.
pub const RQM_PIXELS: i32 = 100;

/// Least-squares fit of `sigma0 ~ a nesz + b pixel + c`.
///
/// Returns the scaling factor `a`, the Pearson correlation of sigma0 and
/// nesz, and the fit residual.
pub fn fit_noise_scaling_coeff(sigma0: &[f64], nesz: &[f64], pixels: &[f64]) -> (f64, f64, f64) {
    let n = sigma0.len() as f64;
    // normal equations of the design matrix [nesz, pixel, 1]
    let mut ata = [[0.0f64; 3]; 3];
    let mut atb = [0.0f64; 3];
    for ((&s, &z), &p) in sigma0.iter().zip(nesz).zip(pixels) {
        let row = [z, p, 1.0];
        for i in 0..3 {
            for j in 0..3 {
                ata[i][j] += row[i] * row[j];
            }
            atb[i] += row[i] * s;
        }
    }
    let solution = solve3(&ata, &atb);
    let residual: f64 = sigma0
        .iter()
        .zip(nesz)
        .zip(pixels)
        .map(|((&s, &z), &p)| {
            let fit = solution[0] * z + solution[1] * p + solution[2];
            (s - fit) * (s - fit)
        })
        .sum::<f64>()
        / n;
    (solution[0], pearson(sigma0, nesz), residual)
}

/// Solve a 3x3 linear system by Cramer's rule.
fn solve3(a: &[[f64; 3]; 3], b: &[f64; 3]) -> [f64; 3] {
    let det = |m: &[[f64; 3]; 3]| {
        m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
            - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
            + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
    };
    let d = det(a);
    if d == 0.0 {
        return [f64::NAN; 3];
    }
    let mut out = [0.0; 3];
    for column in 0..3 {
        let mut m = *a;
        for row in 0..3 {
            m[row][column] = b[row];
        }
        out[column] = det(&m) / d;
    }
    out
}

/// Pearson correlation coefficient of two samples.
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    sxy / (sxx * syy).sqrt()
}

/// Degree-1 polynomial fit: returns (slope, intercept, residual sum of
/// squares).
pub fn polyfit1(x: &[f64], y: &[f64]) -> (f64, f64, f64) {
    let n = x.len() as f64;
    let mx = x.iter().sum::<f64>() / n;
    let my = y.iter().sum::<f64>() / n;
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
    }
    let slope = sxy / sxx;
    let intercept = my - slope * mx;
    let residual: f64 = x
        .iter()
        .zip(y)
        .map(|(&a, &b)| {
            let fit = slope * a + intercept;
            (b - fit) * (b - fit)
        })
        .sum();
    (slope, intercept, residual)
}

/// Per-swath arrays of the noise-scaling experiment.
#[derive(Debug, Default, Clone, Serialize)]
pub struct NoiseScalingFit {
    pub scaling_factor: Vec<f64>,
    pub correlation_coefficient: Vec<f64>,
    pub fit_residual: Vec<f64>,
}

/// The persisted output of the noise-scaling experiment.
#[derive(Debug, Serialize)]
pub struct NoiseScalingResults {
    pub ipf_version: f64,
    pub swaths: HashMap<String, NoiseScalingFit>,
}

/// Per-swath arrays of the power-balancing experiment.
#[derive(Debug, Default, Clone, Serialize)]
pub struct PowerBalancingFit {
    pub correlation_coefficient: Vec<f64>,
    pub fit_residual: Vec<f64>,
    pub balancing_power: Vec<f64>,
}

/// The persisted output of the power-balancing experiment.
#[derive(Debug, Serialize)]
pub struct PowerBalancingResults {
    pub ipf_version: f64,
    pub swaths: HashMap<String, PowerBalancingFit>,
}

/// One boundary sample of the range quality metric.
#[derive(Debug, Clone, Serialize)]
pub struct RqmSample {
    pub quality: f64,
    pub mean_left: f64,
    pub mean_right: f64,
    pub std_left: f64,
    pub std_right: f64,
    pub line: i32,
}

/// Range quality metrics of every algorithm, keyed by algorithm then
/// swath.
#[derive(Debug, Serialize)]
pub struct RqmReport {
    pub ipf_version: f64,
    pub algorithms: HashMap<String, HashMap<String, Vec<RqmSample>>>,
}

/// The shared sampling of both experiments.
struct ExperimentData {
    lines: Vec<i32>,
    pixels: Vec<Vec<i32>>,
    sigma0: VectorSet,
    nesz: VectorSet,
    crop: i32,
}

impl Sentinel1Product {
    fn experiment_data(
        &self,
        pol: Polarization,
        average_lines: usize,
        zoom_step: i32,
    ) -> Result<ExperimentData, S1Error> {
        let data = self.data(pol)?;
        let crop = self.product_name.mode.experiment_crop();
        let lines = data.noise.lines();

        // zoomed pixel axes with linearly resampled noise and calibration
        let cal0 = self.calibration_vectors(pol)?;
        let mut pixels: Vec<Vec<i32>> = vec![];
        let mut noise: VectorSet = vec![];
        let mut cal: VectorSet = vec![];
        for (vector, cal_vec) in data.noise.range.iter().zip(&cal0) {
            let p0: Vec<f64> = vector.pixels.iter().map(|&p| p as f64).collect();
            let zoomed: Vec<i32> = (vector.pixels[0]..*vector.pixels.last().unwrap())
                .step_by(zoom_step as usize)
                .collect();
            let zf: Vec<f64> = zoomed.iter().map(|&p| p as f64).collect();
            noise.push(zf.iter().map(|&p| clamped_interp(p, &p0, &vector.noise)).collect());
            cal.push(zf.iter().map(|&p| clamped_interp(p, &p0, cal_vec)).collect());
            pixels.push(zoomed);
        }

        let shifted = self.shifted_noise_vectors_for(pol, &pixels, &noise)?;
        let scalloping = self.noise_azimuth_vectors_for(pol, &pixels)?;
        let nesz = Self::calibrate_noise_vectors(&shifted, &cal, &scalloping);

        let sigma0_fs = self.raw_sigma0_full_size(pol, 0.0)?;
        let sigma0 = sample_sigma0_vectors(&sigma0_fs, &lines, &pixels, average_lines / 2);
        Ok(ExperimentData {
            lines,
            pixels,
            sigma0,
            nesz,
            crop,
        })
    }

    /// Fit noise scaling factors for each noise line in the central
    /// azimuth band and persist the arrays as gzipped JSON.
    pub fn experiment_noise_scaling<P: AsRef<Path>>(
        &self,
        pol: Polarization,
        output_dir: P,
    ) -> Result<PathBuf, S1Error> {
        self.experiment_noise_scaling_with(pol, output_dir, AVERAGE_LINES, ZOOM_STEP)
    }

    /// [`Self::experiment_noise_scaling`] with explicit sampling
    /// parameters.
    pub fn experiment_noise_scaling_with<P: AsRef<Path>>(
        &self,
        pol: Polarization,
        output_dir: P,
        average_lines: usize,
        zoom_step: i32,
    ) -> Result<PathBuf, S1Error> {
        let data = self.data(pol)?;
        let experiment = self.experiment_data(pol, average_lines, zoom_step)?;
        let last_line = *experiment.lines.last().unwrap_or(&0);
        let margin = (average_lines / 2) as i32;

        let mut results = NoiseScalingResults {
            ipf_version: self.ipf_version,
            swaths: HashMap::new(),
        };
        for bounds in &data.swath_bounds {
            let fit = results
                .swaths
                .entry(bounds.swath.as_str().to_string())
                .or_default();
            for block in &bounds.blocks {
                for (v1, &line) in experiment.lines.iter().enumerate() {
                    if !block.contains_line(line) || line <= margin || line >= last_line - margin {
                        continue;
                    }
                    let (s0, n0, px) = select_cropped(
                        &experiment,
                        v1,
                        block.first_range_sample + experiment.crop,
                        block.last_range_sample - experiment.crop,
                    );
                    if s0.len() < 3 {
                        continue;
                    }
                    let (scaling, correlation, residual) =
                        fit_noise_scaling_coeff(&s0, &n0, &px);
                    fit.scaling_factor.push(scaling);
                    fit.correlation_coefficient.push(correlation);
                    fit.fit_residual.push(residual);
                }
            }
        }

        let path = output_dir
            .as_ref()
            .join(format!("{}_noiseScaling.json.gz", self.product_name.name));
        write_gzipped_json(&path, &results)?;
        Ok(path)
    }

    /// Fit the inter-swath power steps for each valid line and persist the
    /// arrays as gzipped JSON.
    pub fn experiment_power_balancing<P: AsRef<Path>>(
        &self,
        pol: Polarization,
        output_dir: P,
    ) -> Result<PathBuf, S1Error> {
        self.experiment_power_balancing_with(pol, output_dir, AVERAGE_LINES, ZOOM_STEP)
    }

    /// [`Self::experiment_power_balancing`] with explicit sampling
    /// parameters.
    pub fn experiment_power_balancing_with<P: AsRef<Path>>(
        &self,
        pol: Polarization,
        output_dir: P,
        average_lines: usize,
        zoom_step: i32,
    ) -> Result<PathBuf, S1Error> {
        let data = self.data(pol)?;
        let experiment = self.experiment_data(pol, average_lines, zoom_step)?;
        let corrected =
            self.corrected_noise_vectors_for(pol, &experiment.nesz, &experiment.pixels, false)?;
        let last_line = *experiment.lines.last().unwrap_or(&0);
        let margin = (average_lines / 2) as i32;
        let swaths = self.product_name.mode.swaths();

        let mut results = PowerBalancingResults {
            ipf_version: self.ipf_version,
            swaths: swaths
                .iter()
                .map(|s| (s.as_str().to_string(), PowerBalancingFit::default()))
                .collect(),
        };

        for (v1, &line) in experiment.lines.iter().enumerate() {
            if line <= margin || line >= last_line - margin {
                continue;
            }
            // block range limits of every swath at this line
            let mut limits: HashMap<SwathId, (i32, i32)> = HashMap::new();
            for bounds in &data.swath_bounds {
                if let Some(block) = bounds.blocks.iter().find(|b| b.contains_line(line)) {
                    limits.insert(
                        bounds.swath,
                        (block.first_range_sample, block.last_range_sample),
                    );
                }
            }
            if limits.len() != swaths.len() {
                continue;
            }

            let mut fits = vec![];
            let mut samples = vec![];
            let mut incomplete = false;
            for &swath in swaths {
                let (frs, lrs) = limits[&swath];
                let indices: Vec<usize> = experiment.pixels[v1]
                    .iter()
                    .enumerate()
                    .filter(|(k, &p)| {
                        p >= frs + experiment.crop
                            && p <= lrs - experiment.crop
                            && experiment.nesz[v1][*k].is_finite()
                    })
                    .map(|(k, _)| k)
                    .collect();
                if indices.len() < 3 {
                    incomplete = true;
                    break;
                }
                let s0: Vec<f64> = indices.iter().map(|&k| experiment.sigma0[v1][k]).collect();
                let n0: Vec<f64> = indices.iter().map(|&k| corrected[v1][k]).collect();
                let raw_n0: Vec<f64> = indices.iter().map(|&k| experiment.nesz[v1][k]).collect();
                let px: Vec<f64> = indices
                    .iter()
                    .map(|&k| experiment.pixels[v1][k] as f64)
                    .collect();
                let excess: Vec<f64> = s0.iter().zip(&n0).map(|(&s, &n)| s - n).collect();
                let (slope, intercept, residual) = polyfit1(&px, &excess);
                if !slope.is_finite() || !intercept.is_finite() {
                    incomplete = true;
                    break;
                }
                fits.push((slope, intercept));
                let pearson_val = pearson(&s0, &raw_n0);
                samples.push((swath, indices, n0, raw_n0, pearson_val, residual));
            }
            if incomplete {
                continue;
            }

            // power steps at each inter-swath boundary, accumulated
            let mut balancing = vec![0.0; swaths.len()];
            for i in 0..swaths.len() - 1 {
                let boundary = limits[&swaths[i]].1 as f64;
                let left = fits[i].0 * boundary + fits[i].1;
                let right = fits[i + 1].0 * boundary + fits[i + 1].1;
                balancing[i + 1] = right - left;
            }
            for i in 1..balancing.len() {
                balancing[i] += balancing[i - 1];
            }

            // bias so that subswaths from the second onward keep zero mean
            // residual between raw and balanced NESZ
            let from_second = limits[&swaths[1]].0 + experiment.crop;
            let mut residual_sum = 0.0;
            let mut residual_count = 0usize;
            for (i, (_, indices, n0, raw_n0, _, _)) in samples.iter().enumerate() {
                for ((&k, &corrected_value), &raw_value) in
                    indices.iter().zip(n0.iter()).zip(raw_n0.iter())
                {
                    if experiment.pixels[v1][k] >= from_second {
                        residual_sum += raw_value - (corrected_value + balancing[i]);
                        residual_count += 1;
                    }
                }
            }
            if residual_count > 0 {
                let bias = residual_sum / residual_count as f64;
                for b in &mut balancing {
                    *b += bias;
                }
            }

            for (i, (swath, _, _, _, correlation, residual)) in samples.iter().enumerate() {
                let fit = results.swaths.get_mut(swath.as_str()).unwrap();
                fit.correlation_coefficient.push(*correlation);
                fit.fit_residual.push(*residual);
                fit.balancing_power.push(balancing[i]);
            }
        }

        let path = output_dir
            .as_ref()
            .join(format!("{}_powerBalancing.json.gz", self.product_name.name));
        write_gzipped_json(&path, &results)?;
        Ok(path)
    }

    /// Sigma nought at the range-noise coordinates, averaged over an
    /// azimuth window of the measurement raster.
    pub fn raw_sigma0_vectors(
        &self,
        pol: Polarization,
        cal_s0: &[Vec<f64>],
        average_lines: usize,
    ) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let mut dn = measurement::read_digital_numbers(&self.container, self.measurement_member(pol)?)?;
        dn.mapv_inplace(|v| if v == 0.0 { f64::NAN } else { v });
        let lines = data.noise.lines();
        let pixels: Vec<Vec<i32>> = data.noise.range.iter().map(|v| v.pixels.clone()).collect();
        let dn_mean = sample_sigma0_vectors(&dn, &lines, &pixels, average_lines / 2);
        Ok(dn_mean
            .iter()
            .zip(cal_s0)
            .map(|(d, c)| {
                d.iter()
                    .zip(c)
                    .map(|(&d, &c)| d * d / (c * c))
                    .collect()
            })
            .collect())
    }

    /// Range quality metric of one sigma nought vector set: the
    /// normalized step `|mean_l - mean_r| / (std_l + std_r)` at every
    /// inter-swath boundary.
    pub fn compute_rqm(
        &self,
        sigma0: &[Vec<f64>],
        pol: Polarization,
    ) -> Result<HashMap<String, Vec<RqmSample>>, S1Error> {
        let data = self.data(pol)?;
        let lines = data.noise.lines();
        let mut out = HashMap::new();
        let swaths = self.product_name.mode.swaths();
        for &swath in &swaths[..swaths.len() - 1] {
            let Some(bounds) = data.bounds(swath) else { continue };
            let mut samples = vec![];
            for block in &bounds.blocks {
                let lrs = block.last_range_sample;
                for (v1, &line) in lines.iter().enumerate() {
                    if !block.contains_line(line) {
                        continue;
                    }
                    let left: Vec<f64> = data.noise.range[v1]
                        .pixels
                        .iter()
                        .enumerate()
                        .filter(|(_, &p)| p >= lrs - RQM_PIXELS && p <= lrs)
                        .map(|(k, _)| sigma0[v1][k])
                        .collect();
                    let right: Vec<f64> = data.noise.range[v1]
                        .pixels
                        .iter()
                        .enumerate()
                        .filter(|(_, &p)| p >= lrs + 1 && p <= lrs + RQM_PIXELS + 1)
                        .map(|(k, _)| sigma0[v1][k])
                        .collect();
                    let mean_left = nanmean(left.iter());
                    let mean_right = nanmean(right.iter());
                    let std_left = nanstd(left.iter());
                    let std_right = nanstd(right.iter());
                    samples.push(RqmSample {
                        quality: (mean_left - mean_right).abs() / (std_left + std_right),
                        mean_left,
                        mean_right,
                        std_left,
                        std_right,
                        line,
                    });
                }
            }
            out.insert(swath.as_str().to_string(), samples);
        }
        Ok(out)
    }

    /// Compute sigma nought with every algorithm (ESA, SHIFT, NERSC, TG)
    /// and the range quality metric of each.
    pub fn range_quality_metric(&self, pol: Polarization) -> Result<RqmReport, S1Error> {
        let data = self.data(pol)?;
        let cal = self.calibration_vectors(pol)?;

        let ones: VectorSet = data
            .noise
            .range
            .iter()
            .map(|v| vec![1.0; v.pixels.len()])
            .collect();
        let scalloping = self.noise_azimuth_vectors(pol)?;
        let scalloping_esa = if self.ipf_version < crate::noise::AZIMUTH_NOISE_IPF {
            &ones
        } else {
            &scalloping
        };

        let raw: VectorSet = data.noise.range.iter().map(|v| v.noise.clone()).collect();
        let nesz_esa = Self::calibrate_noise_vectors(&raw, &cal, scalloping_esa);
        let shifted = self.shifted_noise_vectors(pol)?;
        let nesz_shifted = Self::calibrate_noise_vectors(&shifted, &cal, &scalloping);
        let nesz_nersc = self.corrected_noise_vectors(pol, &nesz_shifted, true)?;
        let tg = self.noise_tg_vectors(pol)?;
        let nesz_tg = Self::calibrate_noise_vectors(&tg, &cal, &scalloping);

        let sigma0 = self.raw_sigma0_vectors(pol, &cal, 111)?;
        let subtract = |nesz: &VectorSet| -> VectorSet {
            sigma0
                .iter()
                .zip(nesz)
                .map(|(s, n)| s.iter().zip(n).map(|(&s, &n)| s - n).collect())
                .collect()
        };

        let mut algorithms = HashMap::new();
        for (name, nesz) in [
            ("ESA", &nesz_esa),
            ("SHIFT", &nesz_shifted),
            ("NERSC", &nesz_nersc),
            ("TG", &nesz_tg),
        ] {
            algorithms.insert(name.to_string(), self.compute_rqm(&subtract(nesz), pol)?);
        }
        Ok(RqmReport {
            ipf_version: self.ipf_version,
            algorithms,
        })
    }
}

/// Mean of a raster over an azimuth window, sampled at per-vector pixels.
fn sample_sigma0_vectors(
    raster: &Array2<f64>,
    lines: &[i32],
    pixels: &[Vec<i32>],
    half_window: usize,
) -> VectorSet {
    let rows = raster.nrows() as i32;
    lines
        .iter()
        .zip(pixels)
        .map(|(&line, pixel_axis)| {
            let y0 = (line - half_window as i32).max(0) as usize;
            let y1 = ((line + half_window as i32).min(rows - 1) + 1) as usize;
            pixel_axis
                .iter()
                .map(|&p| {
                    let column = raster.slice(ndarray::s![y0..y1, p as usize]);
                    nanmean(column.iter())
                })
                .collect()
        })
        .collect()
}

fn select_cropped(
    experiment: &ExperimentData,
    v1: usize,
    first: i32,
    last: i32,
) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let mut s0 = vec![];
    let mut n0 = vec![];
    let mut px = vec![];
    for (k, &p) in experiment.pixels[v1].iter().enumerate() {
        if p >= first && p <= last && experiment.nesz[v1][k].is_finite() {
            s0.push(experiment.sigma0[v1][k]);
            n0.push(experiment.nesz[v1][k]);
            px.push(p as f64);
        }
    }
    (s0, n0, px)
}

fn write_gzipped_json<T: Serialize>(path: &Path, value: &T) -> Result<(), S1Error> {
    let json = serde_json::to_vec(value).expect("experiment results serialize");
    let file = std::fs::File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&json)?;
    encoder.finish()?;
    Ok(())
}
