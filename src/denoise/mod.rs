// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
The thermal noise removal pipeline.

This module implements the denoising entry points on
[`Sentinel1Product`]: noise vector preparation (raw, shift-corrected or
total-gain based), lifting of sparse vectors to full resolution,
scalloping correction, sigma nought calibration, NESZ subtraction and the
optional texture-noise attenuation. Per-subswath work writes to disjoint
swath-bound blocks and runs on rayon.
*/

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use argmin::core::{CostFunction, Executor, State};
use argmin::solver::neldermead::NelderMead;
use ndarray::Array2;
use rayon::prelude::*;

use crate::antenna::{range_spread_loss_interpolator, BoresightInterpolator, EapInterpolator};
use crate::coefficients::CoefficientTable;
use crate::error::S1Error;
use crate::interp::{CubicSpline, Grid2, LinearSpline};
use crate::measurement;
use crate::noise::AZIMUTH_NOISE_IPF;
use crate::product::{Polarization, Sentinel1Product};
use crate::raster;
use crate::scalloping::{self, ScallopingInput};
use crate::swath::{swath_index_map, SwathBounds, SwathId};
use crate::xml_read::{self, XmlError};

/// Noise vectors evaluated per range-noise line.
pub type VectorSet = Vec<Vec<f64>>;

/// Which noise reconstruction feeds the NESZ raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// The annotated ESA noise vectors, unmodified
    Esa,
    /// Range-shift corrected vectors with noise scaling and power
    /// balancing
    Nersc,
    /// Noise synthesized from the total antenna gain and PG product
    NerscTg,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Algorithm::Esa => "ESA",
                Algorithm::Nersc => "NERSC",
                Algorithm::NerscTg => "NERSC_TG",
            }
        )
    }
}

/// Minimum IPF version whose annotated noise vectors are usable.
const QUALIFIED_VECTOR_IPF: f64 = 2.43;

/// Samples skipped at each border of the shift-fit window.
const SHIFT_FIT_SKIP: usize = 4;

/// Minimum valid samples for a noise LUT shift fit.
const SHIFT_FIT_MIN_VALID: usize = 10;

/// Minimum samples for an EAP/RSL evaluation on one vector.
const EAP_MIN_SIZE: usize = 3;

/// Cost of one candidate LUT shift: squared L2 distance between the
/// shifted noise and the antenna-pattern gain, both scaled to unit range.
struct ShiftCost<'a> {
    pixels: &'a [f64],
    spline: &'a CubicSpline,
    gain: &'a [f64],
}

fn unit_range(values: &[f64]) -> Vec<f64> {
    let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
    let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    if max > min {
        values.iter().map(|v| (v - min) / (max - min)).collect()
    } else {
        vec![0.0; values.len()]
    }
}

impl CostFunction for ShiftCost<'_> {
    type Param = Vec<f64>;
    type Output = f64;

    fn cost(&self, param: &Self::Param) -> Result<Self::Output, argmin::core::Error> {
        let shift = param[0];
        let shifted: Vec<f64> = self.pixels.iter().map(|&p| self.spline.eval(p + shift)).collect();
        let a = unit_range(&shifted);
        let b = unit_range(self.gain);
        Ok(a.iter().zip(&b).map(|(x, y)| (x - y) * (x - y)).sum())
    }
}

/// Find the range shift of one noise LUT against the antenna gain.
fn fit_noise_shift(pixels: &[f64], spline: &CubicSpline, gain: &[f64]) -> Result<f64, S1Error> {
    let cost = ShiftCost {
        pixels,
        spline,
        gain,
    };
    let solver = NelderMead::new(vec![vec![0.0], vec![1.0]])
        .with_sd_tolerance(1e-8)
        .map_err(|e| S1Error::ShiftOptimization(e.to_string()))?;
    let result = Executor::new(cost, solver)
        .configure(|state| state.max_iters(200))
        .run()
        .map_err(|e| S1Error::ShiftOptimization(e.to_string()))?;
    Ok(result
        .state()
        .get_best_param()
        .map(|p| p[0])
        .unwrap_or(0.0))
}

/// A per-line interpolator for lifting sparse samples onto a pixel axis.
enum LineInterp {
    Constant(f64),
    Linear(LinearSpline),
    Cubic(CubicSpline),
}

impl LineInterp {
    /// Degree 3 when enough samples exist, falling back to linear or
    /// constant for degenerate lines.
    fn new(pixels: Vec<f64>, values: Vec<f64>) -> Self {
        match pixels.len() {
            1 => LineInterp::Constant(values[0]),
            2..=3 => LineInterp::Linear(LinearSpline::new(pixels, values)),
            _ => LineInterp::Cubic(CubicSpline::new(pixels, values)),
        }
    }

    fn eval(&self, at: f64) -> f64 {
        match self {
            LineInterp::Constant(v) => *v,
            LineInterp::Linear(s) => s.eval(at),
            LineInterp::Cubic(s) => s.eval(at),
        }
    }
}

impl Sentinel1Product {
    /// 1-based subswath number for every sample of every range-noise
    /// vector (0 where no swath is defined).
    pub fn swath_id_vectors(&self, pol: Polarization) -> Result<Vec<Vec<u8>>, S1Error> {
        let data = self.data(pol)?;
        let pixels: Vec<Vec<i32>> = data.noise.range.iter().map(|v| v.pixels.clone()).collect();
        self.swath_id_vectors_for(pol, &pixels)
    }

    /// Same as [`Self::swath_id_vectors`] for explicit pixel axes.
    pub fn swath_id_vectors_for(
        &self,
        pol: Polarization,
        pixels: &[Vec<i32>],
    ) -> Result<Vec<Vec<u8>>, S1Error> {
        let data = self.data(pol)?;
        let lines = data.noise.lines();
        let mut ids: Vec<Vec<u8>> = pixels.iter().map(|p| vec![0; p.len()]).collect();
        for bounds in &data.swath_bounds {
            let number = bounds.swath.number() as u8;
            for block in &bounds.blocks {
                for (v1, &line) in lines.iter().enumerate() {
                    if !block.contains_line(line) {
                        continue;
                    }
                    for (k, &pixel) in pixels[v1].iter().enumerate() {
                        if block.contains_sample(pixel) {
                            ids[v1][k] = number;
                        }
                    }
                }
            }
        }
        Ok(ids)
    }

    /// Sigma nought calibration evaluated at the range-noise coordinates.
    pub fn calibration_vectors(&self, pol: Polarization) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let cal_lines = data.calibration.lines();
        let cal_pixels: Vec<Vec<i32>> = data
            .calibration
            .vectors
            .iter()
            .map(|v| v.pixels.clone())
            .collect();
        let cal_values: VectorSet = data
            .calibration
            .vectors
            .iter()
            .map(|v| v.sigma_nought.clone())
            .collect();

        let noise_lines = data.noise.lines();
        let mut out: VectorSet = data
            .noise
            .range
            .iter()
            .map(|v| vec![f64::NAN; v.pixels.len()])
            .collect();
        for bounds in &data.swath_bounds {
            let (lift, blocks) = swath_lift(bounds, &cal_lines, &cal_pixels, &cal_values);
            let Some(lift) = lift else { continue };
            for block in blocks {
                for (v1, &line) in noise_lines.iter().enumerate() {
                    if !block.contains_line(line) {
                        continue;
                    }
                    for (k, &pixel) in data.noise.range[v1].pixels.iter().enumerate() {
                        if block.contains_sample(pixel) {
                            out[v1][k] = lift.eval(line as f64, pixel as f64);
                        }
                    }
                }
            }
        }
        Ok(out)
    }

    /// EAP and RSL values at the range-noise coordinates.
    fn eap_rsl_vectors(
        &self,
        pol: Polarization,
        rsl_power: f64,
    ) -> Result<(VectorSet, VectorSet), S1Error> {
        let data = self.data(pol)?;
        let center = self.time_coverage_center();
        let ids = self.swath_id_vectors(pol)?;
        let boresight = BoresightInterpolator::new(
            &data.geolocation,
            &data.antenna_patterns,
            &data.orbit,
            center,
        );
        let rsl = range_spread_loss_interpolator(&data.geolocation, data.reference_range, rsl_power);

        let mut eap_vectors: VectorSet = data
            .noise
            .range
            .iter()
            .map(|v| vec![f64::NAN; v.pixels.len()])
            .collect();
        let mut rsl_vectors = eap_vectors.clone();
        for &swath in self.product_name.mode.swaths() {
            let eap = EapInterpolator::new(self.aux.get(pol, swath)?);
            let number = swath.number() as u8;
            for (v1, vector) in data.noise.range.iter().enumerate() {
                let indices: Vec<usize> = ids[v1]
                    .iter()
                    .enumerate()
                    .filter(|(_, &id)| id == number)
                    .map(|(k, _)| k)
                    .collect();
                if indices.len() <= EAP_MIN_SIZE {
                    continue;
                }
                let line = vector.line as f64;
                for &k in &indices {
                    let pixel = vector.pixels[k] as f64;
                    let angle = boresight.eval(line, pixel);
                    eap_vectors[v1][k] = eap.eval(angle);
                    rsl_vectors[v1][k] = rsl.eval(line, pixel);
                }
            }
        }
        Ok((eap_vectors, rsl_vectors))
    }

    /// PG product amplitude interpolated to the azimuth time of every
    /// range-noise vector, per subswath.
    pub fn pg_product(&self, pol: Polarization) -> Result<HashMap<SwathId, Vec<f64>>, S1Error> {
        let data = self.data(pol)?;
        let center = self.time_coverage_center();
        let vector_times: Vec<f64> = data
            .noise
            .range
            .iter()
            .map(|v| xml_read::seconds_since(v.azimuth_time, center))
            .collect();

        let mut out = HashMap::new();
        for (&swath, series) in &data.pg_amplitudes {
            let times: Vec<f64> = series
                .iter()
                .map(|(t, _)| xml_read::seconds_since(*t, center))
                .collect();
            let values: Vec<f64> = series.iter().map(|(_, v)| *v).collect();
            let spline = LinearSpline::new(times, values);
            out.insert(swath, spline.eval_many(&vector_times));
        }
        Ok(out)
    }

    /// Total gain `(1/(EAP RSL^2))^2` scaled by the PG product, at the
    /// range-noise coordinates.
    pub fn tg_vectors(&self, pol: Polarization) -> Result<VectorSet, S1Error> {
        let (eap, rsl) = self.eap_rsl_vectors(pol, 2.0)?;
        let ids = self.swath_id_vectors(pol)?;
        let pg = self.pg_product(pol)?;
        let mode = self.product_name.mode;
        let mut tg: VectorSet = eap
            .iter()
            .zip(&rsl)
            .map(|(ev, rv)| {
                ev.iter()
                    .zip(rv)
                    .map(|(&e, &r)| (1.0 / e / r).powi(2))
                    .collect()
            })
            .collect();
        for (v1, vector) in tg.iter_mut().enumerate() {
            for &swath in mode.swaths() {
                let Some(pg_vec) = pg.get(&swath) else { continue };
                let number = swath.number() as u8;
                for (k, value) in vector.iter_mut().enumerate() {
                    if ids[v1][k] == number {
                        *value *= pg_vec[v1];
                    }
                }
            }
        }
        Ok(tg)
    }

    /// Noise synthesized from the total gain and the fitted APG scales and
    /// offsets.
    pub fn noise_tg_vectors(&self, pol: Polarization) -> Result<VectorSet, S1Error> {
        self.noise_tg_vectors_with_ipf(pol, self.ipf_version)
    }

    fn noise_tg_vectors_with_ipf(
        &self,
        pol: Polarization,
        ipf_version: f64,
    ) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let (scales, offsets) =
            CoefficientTable::bundled().tg_scales_offsets(&self.product_name, ipf_version)?;
        let tg = self.tg_vectors(pol)?;
        let ids = self.swath_id_vectors(pol)?;
        let mut noise: VectorSet = data
            .noise
            .range
            .iter()
            .map(|v| vec![0.0; v.pixels.len()])
            .collect();
        for (v1, vector) in noise.iter_mut().enumerate() {
            for (k, value) in vector.iter_mut().enumerate() {
                let id = ids[v1][k] as usize;
                if id == 0 || id > scales.len() {
                    continue;
                }
                *value = offsets[id - 1] + tg[v1][k] * scales[id - 1];
            }
        }
        Ok(noise)
    }

    /// Range-shift corrected noise vectors (the NERSC correction).
    pub fn shifted_noise_vectors(&self, pol: Polarization) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let pixels: Vec<Vec<i32>> = data.noise.range.iter().map(|v| v.pixels.clone()).collect();
        let noise: VectorSet = data.noise.range.iter().map(|v| v.noise.clone()).collect();
        self.shifted_noise_vectors_for(pol, &pixels, &noise)
    }

    /// Estimate the range shift of each noise LUT against the antenna
    /// gain pattern and return the LUT resampled at the shifted pixels.
    /// A constant LUT passes through unchanged (the shift is undefined
    /// for it).
    pub fn shifted_noise_vectors_for(
        &self,
        pol: Polarization,
        pixels: &[Vec<i32>],
        noise: &[Vec<f64>],
    ) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let center = self.time_coverage_center();
        let lines = data.noise.lines();
        let boresight = BoresightInterpolator::new(
            &data.geolocation,
            &data.antenna_patterns,
            &data.orbit,
            center,
        );
        let rsl = range_spread_loss_interpolator(&data.geolocation, data.reference_range, 1.5);

        let mut shifted: VectorSet = pixels.iter().map(|p| vec![0.0; p.len()]).collect();
        for bounds in &data.swath_bounds {
            let eap = EapInterpolator::new(self.aux.get(pol, bounds.swath)?);
            for block in &bounds.blocks {
                for (v1, &line) in lines.iter().enumerate() {
                    if !block.contains_line(line) {
                        continue;
                    }
                    // unique in-block pixels with finite noise
                    let mut valid: Vec<usize> = pixels[v1]
                        .iter()
                        .enumerate()
                        .filter(|(k, &p)| block.contains_sample(p) && noise[v1][*k].is_finite())
                        .map(|(k, _)| k)
                        .collect();
                    valid.dedup_by_key(|k| pixels[v1][*k]);
                    if valid.len() < SHIFT_FIT_MIN_VALID {
                        continue;
                    }
                    let valid_pix: Vec<f64> =
                        valid.iter().map(|&k| pixels[v1][k] as f64).collect();
                    let noise_valid: Vec<f64> = valid.iter().map(|&k| noise[v1][k]).collect();

                    if is_constant(&noise_valid) {
                        for (&k, &value) in valid.iter().zip(&noise_valid) {
                            shifted[v1][k] = value;
                        }
                        continue;
                    }

                    let apg: Vec<f64> = valid_pix
                        .iter()
                        .map(|&p| {
                            let gain = eap.eval(boresight.eval(line as f64, p));
                            let loss = rsl.eval(line as f64, p);
                            (1.0 / gain / loss).powi(2)
                        })
                        .collect();

                    let spline = CubicSpline::new(valid_pix.clone(), noise_valid);
                    let window = &valid_pix[SHIFT_FIT_SKIP..valid_pix.len() - SHIFT_FIT_SKIP];
                    let gain_window = &apg[SHIFT_FIT_SKIP..apg.len() - SHIFT_FIT_SKIP];
                    let shift = fit_noise_shift(window, &spline, gain_window)?;
                    for (&k, &p) in valid.iter().zip(&valid_pix) {
                        shifted[v1][k] = spline.eval(p + shift);
                    }
                }
            }
        }
        Ok(shifted)
    }

    /// Apply the per-swath noise scaling (and optionally power balancing)
    /// to NESZ vectors on the annotated pixel axes.
    pub fn corrected_noise_vectors(
        &self,
        pol: Polarization,
        nesz: &[Vec<f64>],
        add_pb: bool,
    ) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let pixels: Vec<Vec<i32>> = data.noise.range.iter().map(|v| v.pixels.clone()).collect();
        self.corrected_noise_vectors_for(pol, nesz, &pixels, add_pb)
    }

    /// Same as [`Self::corrected_noise_vectors`] for explicit pixel axes.
    pub fn corrected_noise_vectors_for(
        &self,
        pol: Polarization,
        nesz: &[Vec<f64>],
        pixels: &[Vec<i32>],
        add_pb: bool,
    ) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let (coefficients, warnings) =
            CoefficientTable::bundled().noise_scaling(&self.product_name, pol, self.ipf_version);
        for warning in warnings {
            self.warn(warning);
        }
        let lines = data.noise.lines();
        let mut corrected: VectorSet = pixels.iter().map(|p| vec![f64::NAN; p.len()]).collect();
        for bounds in &data.swath_bounds {
            let ns = coefficients.ns.get(&bounds.swath).copied().unwrap_or(1.0);
            let pb = coefficients.pb.get(&bounds.swath).copied().unwrap_or(0.0);
            for block in &bounds.blocks {
                for (v1, &line) in lines.iter().enumerate() {
                    if !block.contains_line(line) {
                        continue;
                    }
                    for (k, &pixel) in pixels[v1].iter().enumerate() {
                        if block.contains_sample(pixel) {
                            corrected[v1][k] = nesz[v1][k] * ns;
                            if add_pb {
                                corrected[v1][k] += pb;
                            }
                        }
                    }
                }
            }
        }
        Ok(corrected)
    }

    /// Calibrated NESZ from noise, sigma nought calibration and the
    /// scalloping gain: `s n / c^2`.
    pub fn calibrate_noise_vectors(
        noise: &[Vec<f64>],
        cal_s0: &[Vec<f64>],
        scalloping: &[Vec<f64>],
    ) -> VectorSet {
        noise
            .iter()
            .zip(cal_s0)
            .zip(scalloping)
            .map(|((n, c), s)| {
                n.iter()
                    .zip(c)
                    .zip(s)
                    .map(|((&n, &c), &s)| s * n / (c * c))
                    .collect()
            })
            .collect()
    }

    /// Scalloping gain reconstructed from the antenna geometry for every
    /// image line of one subswath.
    pub fn scalloping_gain(&self, pol: Polarization, swath: SwathId) -> Result<Vec<f64>, S1Error> {
        let data = self.data(pol)?;
        let center = self.time_coverage_center();
        let bounds = data
            .bounds(swath)
            .ok_or_else(|| S1Error::LengthMismatch {
                context: "swath bounds lookup",
                left: data.swath_bounds.len(),
                right: self.product_name.mode.swath_count(),
            })?;
        let pattern = data
            .antenna_patterns
            .iter()
            .find(|p| p.swath == swath)
            .ok_or(S1Error::InsufficientAntennaPattern(0))?;
        let number_of_input_lines =
            *data
                .number_of_input_lines
                .get(&swath)
                .ok_or_else(|| S1Error::BurstCountUndetermined {
                    swath: swath.as_str().to_string(),
                    number_of_input_lines: 0,
                    max_bursts: 0,
                })?;
        scalloping::scalloping_gain(&ScallopingInput {
            swath_bounds: bounds,
            geolocation: &data.geolocation,
            orbit: &data.orbit,
            fm_rates: &data.fm_rates,
            burst_reference_times: pattern.relative_azimuth_times(center),
            aux: self.aux.get(pol, swath)?,
            center,
            number_of_lines: data.number_of_lines,
            azimuth_frequency: data.azimuth_frequency,
            number_of_input_lines,
            mode: self.product_name.mode,
        })
    }

    /// Scalloping gain sampled at the range-noise coordinates.
    pub fn noise_azimuth_vectors(&self, pol: Polarization) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let pixels: Vec<Vec<i32>> = data.noise.range.iter().map(|v| v.pixels.clone()).collect();
        self.noise_azimuth_vectors_for(pol, &pixels)
    }

    /// Same as [`Self::noise_azimuth_vectors`] for explicit pixel axes.
    pub fn noise_azimuth_vectors_for(
        &self,
        pol: Polarization,
        pixels: &[Vec<i32>],
    ) -> Result<VectorSet, S1Error> {
        let data = self.data(pol)?;
        let lines = data.noise.lines();
        let mut scalloping: VectorSet = pixels.iter().map(|p| vec![0.0; p.len()]).collect();

        if self.ipf_version < AZIMUTH_NOISE_IPF {
            let ids = self.swath_id_vectors_for(pol, pixels)?;
            for &swath in self.product_name.mode.swaths() {
                let gain = self.scalloping_gain(pol, swath)?;
                let number = swath.number() as u8;
                for (v1, &line) in lines.iter().enumerate() {
                    for (k, value) in scalloping[v1].iter_mut().enumerate() {
                        if ids[v1][k] == number {
                            *value = gain[line as usize];
                        }
                    }
                }
            }
            return Ok(scalloping);
        }

        for vector in &data.noise.azimuth {
            let spline = azimuth_noise_spline(&vector.lines, &vector.noise);
            for (v1, &line) in lines.iter().enumerate() {
                if line < vector.first_azimuth_line || line > vector.last_azimuth_line {
                    continue;
                }
                let value = spline.eval(line as f64);
                for (k, &pixel) in pixels[v1].iter().enumerate() {
                    if pixel >= vector.first_range_sample && pixel <= vector.last_range_sample {
                        scalloping[v1][k] = value;
                    }
                }
            }
        }
        Ok(scalloping)
    }

    /// The full-resolution scalloping raster.
    pub fn scalloping_full_size(&self, pol: Polarization) -> Result<Array2<f64>, S1Error> {
        let data = self.data(pol)?;
        let shape = data.shape();
        let mut out = Array2::zeros(shape);

        if self.ipf_version < AZIMUTH_NOISE_IPF {
            let map = swath_index_map(&data.swath_bounds, shape);
            for &swath in self.product_name.mode.swaths() {
                let gain = self.scalloping_gain(pol, swath)?;
                let number = swath.number() as u8;
                for ((r, c), value) in out.indexed_iter_mut() {
                    if map[[r, c]] == number {
                        *value = gain[r];
                    }
                }
            }
            return Ok(out);
        }

        for vector in &data.noise.azimuth {
            let spline = azimuth_noise_spline(&vector.lines, &vector.noise);
            for line in vector.first_azimuth_line..=vector.last_azimuth_line {
                let value = spline.eval(line as f64);
                for sample in vector.first_range_sample..=vector.last_range_sample {
                    out[[line as usize, sample as usize]] = value;
                }
            }
        }
        Ok(out)
    }

    /// Lift per-line vectors to the full raster, block by block.
    ///
    /// `lines`/`pixels`/`values` describe one sample set (noise or
    /// calibration vectors). Subswaths are processed in parallel; each
    /// writes only its own bound blocks and everything outside stays NaN.
    pub fn vectors_full_size(
        &self,
        pol: Polarization,
        lines: &[i32],
        pixels: &[Vec<i32>],
        values: &[Vec<f64>],
        power: f64,
    ) -> Result<Array2<f64>, S1Error> {
        let data = self.data(pol)?;
        let shape = data.shape();
        let mut out = Array2::from_elem(shape, f64::NAN);

        let per_swath: Vec<Vec<(usize, usize, Array2<f64>)>> = data
            .swath_bounds
            .par_iter()
            .map(|bounds| {
                let (lift, blocks) = swath_lift(bounds, lines, pixels, values);
                let Some(lift) = lift else { return vec![] };
                blocks
                    .iter()
                    .map(|block| {
                        let rows: Vec<f64> = (block.first_azimuth_line..=block.last_azimuth_line)
                            .map(|l| l as f64)
                            .collect();
                        let cols: Vec<f64> = (block.first_range_sample
                            ..=block.last_range_sample)
                            .map(|p| p as f64)
                            .collect();
                        let mut values = lift.eval_grid(&rows, &cols);
                        if power != 1.0 {
                            values.mapv_inplace(|v| v.powf(power));
                        }
                        (
                            block.first_azimuth_line as usize,
                            block.first_range_sample as usize,
                            values,
                        )
                    })
                    .collect()
            })
            .collect();

        for blocks in per_swath {
            for (row, col, values) in blocks {
                raster::write_block(&mut out, row, col, &values);
            }
        }
        Ok(out)
    }

    /// The full-resolution NESZ raster for one algorithm.
    pub fn nesz_full_size(
        &self,
        pol: Polarization,
        algorithm: Algorithm,
    ) -> Result<Array2<f64>, S1Error> {
        self.nesz_full_size_with_ipf(pol, algorithm, self.ipf_version)
    }

    fn nesz_full_size_with_ipf(
        &self,
        pol: Polarization,
        algorithm: Algorithm,
        ipf_version: f64,
    ) -> Result<Array2<f64>, S1Error> {
        let data = self.data(pol)?;

        // annotated vectors below IPF 2.43 are not qualified; fall back to
        // the total-gain path
        let algorithm = if ipf_version < QUALIFIED_VECTOR_IPF && algorithm != Algorithm::NerscTg {
            self.warn(format!(
                "IPF {ipf_version} noise vectors are not qualified; falling back to the total-gain noise model"
            ));
            Algorithm::NerscTg
        } else {
            algorithm
        };

        let noise: VectorSet = match algorithm {
            Algorithm::Esa => data.noise.range.iter().map(|v| v.noise.clone()).collect(),
            Algorithm::Nersc => self.shifted_noise_vectors(pol)?,
            Algorithm::NerscTg => self.noise_tg_vectors_with_ipf(pol, ipf_version)?,
        };

        let cal = self.calibration_vectors(pol)?;
        let nesz: VectorSet = noise
            .iter()
            .zip(&cal)
            .map(|(n, c)| n.iter().zip(c).map(|(&n, &c)| n / (c * c)).collect())
            .collect();

        let lines = data.noise.lines();
        let pixels: Vec<Vec<i32>> = data.noise.range.iter().map(|v| v.pixels.clone()).collect();
        let mut nesz_fs = self.vectors_full_size(pol, &lines, &pixels, &nesz, 1.0)?;

        let scalloping = self.scalloping_full_size(pol)?;
        for (n, s) in nesz_fs.iter_mut().zip(scalloping.iter()) {
            *n *= s;
        }

        if algorithm == Algorithm::Nersc {
            nesz_fs = self.corrected_nesz_full_size_with_ipf(pol, nesz_fs, ipf_version)?;
        }
        Ok(nesz_fs)
    }

    /// Apply noise scaling and power balancing per swath block at full
    /// resolution.
    pub fn corrected_nesz_full_size(
        &self,
        pol: Polarization,
        nesz: Array2<f64>,
    ) -> Result<Array2<f64>, S1Error> {
        self.corrected_nesz_full_size_with_ipf(pol, nesz, self.ipf_version)
    }

    fn corrected_nesz_full_size_with_ipf(
        &self,
        pol: Polarization,
        mut nesz: Array2<f64>,
        ipf_version: f64,
    ) -> Result<Array2<f64>, S1Error> {
        let data = self.data(pol)?;
        let (coefficients, warnings) =
            CoefficientTable::bundled().noise_scaling(&self.product_name, pol, ipf_version);
        for warning in warnings {
            self.warn(warning);
        }
        for bounds in &data.swath_bounds {
            let ns = coefficients.ns.get(&bounds.swath).copied().unwrap_or(1.0);
            let pb = coefficients.pb.get(&bounds.swath).copied().unwrap_or(0.0);
            for block in &bounds.blocks {
                for line in block.first_azimuth_line..=block.last_azimuth_line {
                    for sample in block.first_range_sample..=block.last_range_sample {
                        let value = &mut nesz[[line as usize, sample as usize]];
                        *value = *value * ns + pb;
                    }
                }
            }
        }
        Ok(nesz)
    }

    /// Calibrated sigma nought at full resolution:
    /// `DN^2 / cal_sigma0^2`, NaN where `DN <= min_dn`.
    pub fn raw_sigma0_full_size(
        &self,
        pol: Polarization,
        min_dn: f64,
    ) -> Result<Array2<f64>, S1Error> {
        let data = self.data(pol)?;
        let dn = measurement::read_digital_numbers(&self.container, self.measurement_member(pol)?)?;

        let cal_lines = data.calibration.lines();
        let cal_pixels: Vec<Vec<i32>> = data
            .calibration
            .vectors
            .iter()
            .map(|v| v.pixels.clone())
            .collect();
        let cal_values: VectorSet = data
            .calibration
            .vectors
            .iter()
            .map(|v| v.sigma_nought.clone())
            .collect();
        let cal_fs = self.vectors_full_size(pol, &cal_lines, &cal_pixels, &cal_values, 2.0)?;

        let mut sigma0 = dn;
        for (s, c) in sigma0.iter_mut().zip(cal_fs.iter()) {
            *s = if *s <= min_dn { f64::NAN } else { *s * *s / c };
        }
        Ok(sigma0)
    }

    /// Calibrated sigma nought with the noise-equivalent sigma zero
    /// subtracted.
    pub fn remove_thermal_noise(
        &self,
        pol: Polarization,
        algorithm: Algorithm,
        remove_negative: bool,
        min_dn: f64,
    ) -> Result<Array2<f64>, S1Error> {
        let nesz_fs = self.nesz_full_size(pol, algorithm)?;
        let mut sigma0 = self.raw_sigma0_full_size(pol, min_dn)?;
        for (s, n) in sigma0.iter_mut().zip(nesz_fs.iter()) {
            *s -= n;
        }
        if remove_negative {
            let mask = sigma0.map(|&v| v <= 0.0);
            sigma0 = raster::fill_gaps(&sigma0, &mask);
        }
        Ok(sigma0)
    }

    /// Thermal noise removal followed by texture-noise compensation.
    ///
    /// The output is a weighted average of sigma nought and its
    /// Gaussian-smoothed version, weighted by the signal-to-noise ratio,
    /// offset by the mean noise so the total power is preserved. Values
    /// below `s0_min` are clipped via gap filling. A scene whose NESZ is
    /// entirely zero (missing vectors) skips noise removal.
    #[allow(clippy::too_many_arguments)]
    pub fn remove_texture_noise(
        &self,
        pol: Polarization,
        window: f64,
        weight: f64,
        s0_min: f64,
        remove_negative: bool,
        algorithm: Algorithm,
        min_dn: f64,
    ) -> Result<Array2<f64>, S1Error> {
        // coefficient tables for IPF 3.2 match 3.1
        let ipf_version = if self.ipf_version == 3.2 {
            3.1
        } else {
            self.ipf_version
        };
        let mut sigma0 = self.raw_sigma0_full_size(pol, min_dn)?;
        let nesz = self.nesz_full_size_with_ipf(pol, algorithm, ipf_version)?;
        let offset = raster::nanmean(nesz.iter());

        let output = if offset == 0.0 {
            sigma0
        } else {
            for (s, n) in sigma0.iter_mut().zip(nesz.iter()) {
                *s -= n;
            }
            let smoothed = raster::gaussian_filter(&sigma0, window);
            let mut out = Array2::zeros(sigma0.dim());
            for (((o, &s), &g), &n) in out
                .iter_mut()
                .zip(sigma0.iter())
                .zip(smoothed.iter())
                .zip(nesz.iter())
            {
                let snr = g / n;
                *o = (weight * g + snr * s) / (weight + snr) + offset;
            }
            out
        };

        let minimum = output.iter().cloned().fold(f64::INFINITY, f64::min);
        if remove_negative && minimum < 0.0 {
            let mask = output.map(|&v| v <= s0_min);
            return Ok(raster::fill_gaps(&output, &mask));
        }
        Ok(output)
    }

    /// Write the shifted and scaled range-noise LUTs back into a copy of
    /// the product's noise XML (NaN samples become 0).
    pub fn export_noise_xml<P: AsRef<Path>>(
        &self,
        pol: Polarization,
        output_dir: P,
    ) -> Result<PathBuf, S1Error> {
        let data = self.data(pol)?;
        let member = self.noise_member(pol)?.to_string();
        let xml = self.container.read_to_string(&member)?;

        let shifted = self.shifted_noise_vectors(pol)?;
        let corrected = self.corrected_noise_vectors(pol, &shifted, true)?;
        let pixels: Vec<Vec<i32>> = data.noise.range.iter().map(|v| v.pixels.clone()).collect();

        let (vector_name, lut_name): (&[u8], &[u8]) = if self.ipf_version < AZIMUTH_NOISE_IPF {
            (b"noiseVector", b"noiseLut")
        } else {
            (b"noiseRangeVector", b"noiseRangeLut")
        };
        let rewritten = rewrite_noise_xml(&xml, vector_name, lut_name, &pixels, &corrected)
            .map_err(|message| XmlError::Malformed {
                filename: member.clone(),
                message,
            })?;

        let basename = member.rsplit('/').next().unwrap_or(&member);
        let output_path = output_dir.as_ref().join(basename);
        std::fs::write(&output_path, rewritten)?;
        Ok(output_path)
    }
}

/// Degree-1 spline over azimuth noise samples; a single sample is a
/// constant.
fn azimuth_noise_spline(lines: &[i32], noise: &[f64]) -> LinearSpline {
    LinearSpline::new(
        lines.iter().map(|&l| l as f64).collect(),
        noise.to_vec(),
    )
}

fn is_constant(values: &[f64]) -> bool {
    let first = values[0];
    values
        .iter()
        .all(|v| (v - first).abs() <= 1e-8 + 1e-5 * first.abs())
}

/// Per-swath lift of sparse per-line vectors: a cubic spline per line
/// over its valid in-block pixels, evaluated on the swath-wide pixel
/// axis, stacked into a degree-1 bivariate surface.
///
/// Returns `None` when no vector line falls inside the swath.
fn swath_lift<'a>(
    bounds: &'a SwathBounds,
    lines: &[i32],
    pixels: &[Vec<i32>],
    values: &[Vec<f64>],
) -> (Option<Grid2>, &'a [crate::swath::BoundBlock]) {
    let pix_fr: Vec<f64> = bounds
        .full_range_pixels()
        .iter()
        .map(|&p| p as f64)
        .collect();
    let mut swath_lines: Vec<f64> = vec![];
    let mut rows: Vec<Vec<f64>> = vec![];
    for block in &bounds.blocks {
        for (v1, &line) in lines.iter().enumerate() {
            if !block.contains_line(line) {
                continue;
            }
            let valid: Vec<usize> = pixels[v1]
                .iter()
                .enumerate()
                .filter(|(k, &p)| block.contains_sample(p) && values[v1][*k].is_finite())
                .map(|(k, _)| k)
                .collect();
            swath_lines.push(line as f64);
            if valid.is_empty() {
                rows.push(vec![f64::NAN; pix_fr.len()]);
            } else {
                let vp: Vec<f64> = valid.iter().map(|&k| pixels[v1][k] as f64).collect();
                let vz: Vec<f64> = valid.iter().map(|&k| values[v1][k]).collect();
                let interp = LineInterp::new(vp, vz);
                rows.push(pix_fr.iter().map(|&p| interp.eval(p)).collect());
            }
        }
    }
    if swath_lines.is_empty() || pix_fr.is_empty() {
        return (None, &bounds.blocks);
    }
    let mut z = Array2::zeros((swath_lines.len(), pix_fr.len()));
    for (r, row) in rows.iter().enumerate() {
        for (c, &value) in row.iter().enumerate() {
            z[[r, c]] = value;
        }
    }
    (
        Some(Grid2::new(swath_lines, pix_fr, z)),
        &bounds.blocks,
    )
}

/// Stream-rewrite a noise document, replacing the `<pixel>` and LUT text
/// of each range vector with the supplied values.
fn rewrite_noise_xml(
    xml: &str,
    vector_name: &[u8],
    lut_name: &[u8],
    pixels: &[Vec<i32>],
    noise: &[Vec<f64>],
) -> Result<Vec<u8>, String> {
    use quick_xml::events::{BytesText, Event};
    use quick_xml::{Reader, Writer};

    let format_pixels = |index: usize| -> String {
        pixels[index]
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    };
    let format_noise = |index: usize| -> String {
        noise[index]
            .iter()
            .map(|n| {
                if n.is_nan() {
                    "0".to_string()
                } else {
                    n.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::new());
    let mut in_vector = false;
    let mut index = 0usize;
    let mut replacement: Option<String> = None;
    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Start(e) => {
                let name = e.local_name();
                if name.as_ref() == vector_name {
                    in_vector = true;
                } else if in_vector && index < pixels.len() {
                    if name.as_ref() == b"pixel" {
                        replacement = Some(format_pixels(index));
                    } else if name.as_ref() == lut_name {
                        replacement = Some(format_noise(index));
                    }
                }
                writer.write_event(Event::Start(e)).map_err(|e| e.to_string())?;
            }
            Event::Text(t) => {
                match replacement.take() {
                    Some(text) => writer
                        .write_event(Event::Text(BytesText::new(&text)))
                        .map_err(|e| e.to_string())?,
                    None => writer.write_event(Event::Text(t)).map_err(|e| e.to_string())?,
                };
            }
            Event::End(e) => {
                // an empty element never produced a text event
                if let Some(text) = replacement.take() {
                    writer
                        .write_event(Event::Text(BytesText::new(&text)))
                        .map_err(|e| e.to_string())?;
                }
                if e.local_name().as_ref() == vector_name {
                    in_vector = false;
                    index += 1;
                }
                writer.write_event(Event::End(e)).map_err(|e| e.to_string())?;
            }
            Event::Eof => break,
            other => writer.write_event(other).map_err(|e| e.to_string())?,
        }
    }
    Ok(writer.into_inner())
}
