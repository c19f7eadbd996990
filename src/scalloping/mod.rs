// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Reconstruction of the per-subswath scalloping gain

TOPS antenna steering modulates the azimuth gain periodically within each
focused burst. Products processed from IPF 2.9 annotate this gain as
azimuth noise vectors; for older products it is reconstructed here from
the antenna element pattern, the steering rate, the combined Doppler rate
and the burst timing.
*/

use chrono::NaiveDateTime;

use crate::aux_cal::AuxCalParams;
use crate::error::S1Error;
use crate::fm_rate::{self, AzimuthFmRate};
use crate::geolocation::GeolocationGrid;
use crate::interp::clamped_interp;
use crate::orbit::Orbit;
use crate::swath::{ObsMode, SwathBounds};
use crate::RADAR_WAVELENGTH;

/// Focused burst length in zero-Doppler time for one subswath.
///
/// The burst count is the largest divisor (greater than one) of the SLC
/// input line count that keeps at least the nominal number of lines per
/// burst. A line count with no such divisor (a prime count, in
/// particular) cannot be split into bursts.
pub fn focused_burst_length(
    mode: ObsMode,
    swath_name: &str,
    azimuth_frequency: f64,
    number_of_input_lines: usize,
) -> Result<f64, S1Error> {
    let max_bursts = number_of_input_lines / mode.nominal_lines_per_burst();
    let number_of_bursts = (2..=max_bursts)
        .filter(|d| number_of_input_lines % d == 0)
        .max()
        .ok_or_else(|| S1Error::BurstCountUndetermined {
            swath: swath_name.to_string(),
            number_of_input_lines,
            max_bursts,
        })?;
    Ok(number_of_input_lines as f64 / number_of_bursts as f64 / azimuth_frequency)
}

/// Everything the scalloping model needs for one subswath.
pub struct ScallopingInput<'a> {
    /// Bound blocks of the subswath
    pub swath_bounds: &'a SwathBounds,
    /// Geolocation grid of the polarization
    pub geolocation: &'a GeolocationGrid,
    /// Orbit state vectors
    pub orbit: &'a Orbit,
    /// Azimuth FM rate records
    pub fm_rates: &'a [AzimuthFmRate],
    /// Antenna pattern azimuth times of this subswath, relative seconds
    pub burst_reference_times: Vec<f64>,
    /// AUX_CAL parameters of (polarization, subswath)
    pub aux: &'a AuxCalParams,
    /// Scene centre time
    pub center: NaiveDateTime,
    /// Number of image lines
    pub number_of_lines: usize,
    /// Azimuth sampling frequency, Hz
    pub azimuth_frequency: f64,
    /// SLC input line count of this subswath
    pub number_of_input_lines: usize,
    /// Acquisition mode
    pub mode: ObsMode,
}

/// Scalloping gain for every image line of one subswath.
pub fn scalloping_gain(input: &ScallopingInput) -> Result<Vec<f64>, S1Error> {
    let swath = input.swath_bounds.swath;
    let center_sample = input.swath_bounds.center_sample_index() as f64;

    // slant range time and relative azimuth time along the centre column
    let lines: Vec<f64> = (0..input.number_of_lines).map(|l| l as f64).collect();
    let tau_interp = input
        .geolocation
        .interpolator(&input.geolocation.slant_range_time);
    let eta_interp = input
        .geolocation
        .interpolator(&input.geolocation.relative_azimuth_time(input.center));
    let slant_range_time: Vec<f64> = lines.iter().map(|&l| tau_interp.eval(l, center_sample)).collect();
    let azimuth_time: Vec<f64> = lines.iter().map(|&l| eta_interp.eval(l, center_sample)).collect();

    // Doppler rate induced by satellite motion
    let motion_rate = fm_rate::fm_rate_at(
        input.fm_rates,
        input.center,
        &azimuth_time,
        &slant_range_time,
    )?;
    // Doppler rate induced by TOPS steering of the antenna
    let steering_rate = swath.antenna_steering_rate().to_radians();
    let velocity = input.orbit.velocity_magnitudes(input.center, &azimuth_time);
    let combined_rate: Vec<f64> = motion_rate
        .iter()
        .zip(&velocity)
        .map(|(&ka, &vs)| {
            let ks = 2.0 * vs / RADAR_WAVELENGTH * steering_rate;
            ka * ks / (ka - ks)
        })
        .collect();

    let burst_length = focused_burst_length(
        input.mode,
        swath.as_str(),
        input.azimuth_frequency,
        input.number_of_input_lines,
    )?;
    let burst_time = burst_times(
        &input.burst_reference_times,
        burst_length,
        &azimuth_time,
    )?;

    // azimuth antenna element pattern lookup axis
    let aaep = &input.aux.azimuth_pattern;
    let half = (aaep.len() / 2) as f64;
    let angles: Vec<f64> = (0..aaep.len())
        .map(|i| (i as f64 - half) * input.aux.azimuth_angle_increment)
        .collect();

    Ok(burst_time
        .iter()
        .zip(&velocity)
        .zip(&combined_rate)
        .map(|((&tb, &vs), &kt)| {
            let steering_angle = (RADAR_WAVELENGTH / (2.0 * vs) * kt * tb).to_degrees();
            let gain_db = clamped_interp(steering_angle, &angles, aaep);
            1.0 / 10f64.powf(gain_db / 10.0)
        })
        .collect())
}

/// Convert line azimuth times into burst times: the offset of each line
/// from the midpoint of the burst interval containing it.
///
/// Burst starts come from the antenna pattern azimuth times, advanced by
/// half the burst overlap, and are extended with the closest spacing until
/// they bracket the image.
fn burst_times(
    reference_times: &[f64],
    burst_length: f64,
    azimuth_time: &[f64],
) -> Result<Vec<f64>, S1Error> {
    if reference_times.len() < 2 {
        return Err(S1Error::InsufficientAntennaPattern(reference_times.len()));
    }
    let mut spacing: Vec<f64> = reference_times.windows(2).map(|w| w[1] - w[0]).collect();
    spacing.insert(0, spacing[0]);
    let mut starts: Vec<f64> = reference_times
        .iter()
        .zip(&spacing)
        .map(|(&t, &dt)| t + (burst_length - dt) / 2.0)
        .collect();

    let first_line = azimuth_time[0];
    let last_line = azimuth_time[azimuth_time.len() - 1];
    while starts[0] > first_line {
        starts.insert(0, starts[0] - (starts[1] - starts[0]));
    }
    while starts[starts.len() - 1] < last_line {
        starts.push(starts[starts.len() - 1] + (starts[starts.len() - 1] - starts[starts.len() - 2]));
    }

    Ok(azimuth_time
        .iter()
        .map(|&t| {
            for w in starts.windows(2) {
                if t >= w[0] && t < w[1] {
                    return t - (w[0] + w[1]) / 2.0;
                }
            }
            t
        })
        .collect())
}

#[cfg(test)]
mod test;
