//! DFPWM1a decoder
//!
//! One input bit (LSB first) yields one output sample. The decoder is the
//! ComputerCraft flavour: adaptive charge/strength predictor, antijerk
//! averaging on bit flips, then a one-pole low-pass.

use super::{CodecError, FrameCodec};

const PREC: i32 = 10;
const STRENGTH_MAX: i32 = (1 << PREC) - 1;
const STRENGTH_MIN: i32 = 2 << (PREC - 8);
const LPF_STRENGTH: i32 = 140;

/// Stateful DFPWM1a decoder for a single channel
#[derive(Debug, Clone, Default)]
pub struct Dfpwm {
    charge: i32,
    strength: i32,
    previous_bit: bool,
    previous_charge: i32,
    low_pass_charge: i32,
}

impl Dfpwm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one bit through the predictor, returning the new charge
    fn predict(&mut self, bit: bool) -> i32 {
        let target = if bit { 127 } else { -128 };

        let mut next_charge =
            self.charge + ((self.strength * (target - self.charge) + (1 << (PREC - 1))) >> PREC);
        if next_charge == self.charge && next_charge != target {
            next_charge += if bit { 1 } else { -1 };
        }

        let same = bit == self.previous_bit;
        let strength_target = if same { STRENGTH_MAX } else { 0 };
        let mut next_strength = self.strength;
        if next_strength != strength_target {
            next_strength += if same { 1 } else { -1 };
        }
        if next_strength < STRENGTH_MIN {
            next_strength = STRENGTH_MIN;
        }

        self.charge = next_charge;
        self.strength = next_strength;
        next_charge
    }

    fn decode_bit(&mut self, bit: bool) -> i8 {
        let charge = self.predict(bit);

        let antijerk = if bit != self.previous_bit {
            (charge + self.previous_charge + 1) >> 1
        } else {
            charge
        };
        self.previous_bit = bit;
        self.previous_charge = charge;

        self.low_pass_charge += ((antijerk - self.low_pass_charge) * LPF_STRENGTH + 0x80) >> 8;
        self.low_pass_charge.clamp(-128, 127) as i8
    }
}

impl FrameCodec for Dfpwm {
    fn decode(&mut self, input: &[u8]) -> Result<Vec<i8>, CodecError> {
        let mut out = Vec::with_capacity(input.len() * 8);
        for &byte in input {
            let mut bits = byte;
            for _ in 0..8 {
                out.push(self.decode_bit(bits & 1 != 0));
                bits >>= 1;
            }
        }
        Ok(out)
    }

    fn name(&self) -> &'static str {
        "dfpwm1a"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eight_samples_per_byte() {
        let mut codec = Dfpwm::new();
        let out = codec.decode(&[0x55; 6000]).unwrap();
        assert_eq!(out.len(), 48_000);
    }

    #[test]
    fn test_all_ones_rises_all_zeros_falls() {
        let mut up = Dfpwm::new();
        let out = up.decode(&[0xFF; 64]).unwrap();
        assert!(*out.last().unwrap() > 100);

        let mut down = Dfpwm::new();
        let out = down.decode(&[0x00; 64]).unwrap();
        assert!(*out.last().unwrap() < -100);
    }

    #[test]
    fn test_alternating_bits_stay_near_zero() {
        let mut codec = Dfpwm::new();
        let out = codec.decode(&[0x55; 512]).unwrap();
        assert!(out[out.len() - 256..].iter().all(|s| s.abs() < 16));
    }

    #[test]
    fn test_state_carries_across_calls() {
        let input: Vec<u8> = (0..200u32).map(|i| (i * 37 % 256) as u8).collect();

        let mut whole = Dfpwm::new();
        let expected = whole.decode(&input).unwrap();

        let mut split = Dfpwm::new();
        let mut actual = split.decode(&input[..77]).unwrap();
        actual.extend(split.decode(&input[77..]).unwrap());

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_fresh_instances_are_deterministic() {
        let input = [0x12, 0xF0, 0x0F, 0xAA];
        assert_eq!(
            Dfpwm::new().decode(&input).unwrap(),
            Dfpwm::new().decode(&input).unwrap()
        );
    }
}
