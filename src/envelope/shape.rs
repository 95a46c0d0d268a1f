//! Transition curves and pitch scaling.

/*
Shapes and Scaling
==================

Linear Amplitude
----------------

    level(frac) = start + (target - start) * frac

Linear Decibels
---------------

The line is drawn between the two endpoints expressed in dB:

    db(frac)    = db(start) + (db(target) - db(start)) * frac
    level(frac) = 10^(db(frac) / 20)

A level of zero has no dB value, so both endpoints are clamped to a floor
of -100 dB (amplitude 1e-5) before the log. The curve therefore starts at
the floor when rising out of silence and ends at the floor when decaying
into it; the phase end always lands on the exact target regardless. The
line runs on magnitudes and takes the sign of the target (or of the start
when the target is zero).

Pitch Scaling
-------------

Amplitude and rate can follow the note's pitch:

    scale = (freq / norm_freq) ^ (-rolloff)

    rolloff  0.0   no pitch dependence
    rolloff  1.0   one octave up halves the value
    rolloff -1.0   one octave up doubles it

A non-positive frequency or normalisation disables scaling (scale = 1).
*/

use super::phase::TransitionShape;

/// Floor used in place of non-positive amplitudes in the dB domain.
pub const DECIBEL_FLOOR: f64 = -100.0;

#[inline]
pub fn amplitude_to_db(amplitude: f64) -> f64 {
    let floor_amp = db_to_amplitude(DECIBEL_FLOOR);
    20.0 * amplitude.abs().max(floor_amp).log10()
}

#[inline]
pub fn db_to_amplitude(db: f64) -> f64 {
    10f64.powf(db / 20.0)
}

#[inline]
pub fn pitch_scale(freq: f64, rolloff: f64, norm_freq: f64) -> f64 {
    if freq <= 0.0 || norm_freq <= 0.0 || rolloff == 0.0 {
        return 1.0;
    }
    (freq / norm_freq).powf(-rolloff)
}

/// Duration multiplier for an accent contribution: positive accents speed
/// the phase up, one unit per octave of rate.
#[inline]
pub fn rate_accent_scale(contribution: f64) -> f64 {
    if contribution == 0.0 {
        1.0
    } else {
        (-contribution).exp2()
    }
}

/// Level at `frac` (clamped to 0..=1) of the way from `start` to `target`.
pub fn interpolate(start: f64, target: f64, frac: f64, shape: TransitionShape) -> f64 {
    let frac = frac.clamp(0.0, 1.0);
    match shape {
        TransitionShape::LinearAmplitude => start + (target - start) * frac,
        TransitionShape::LinearDecibels => {
            if frac >= 1.0 {
                return target;
            }
            let a = amplitude_to_db(start);
            let b = amplitude_to_db(target);
            let magnitude = db_to_amplitude(a + (b - a) * frac);
            let negative = target < 0.0 || (target == 0.0 && start < 0.0);
            if negative {
                -magnitude
            } else {
                magnitude
            }
        }
    }
}
