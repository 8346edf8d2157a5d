use crate::calibration::CalibrationError;
use crate::specification::{CompuMethod, ConversionType};

impl CompuMethod {
    /// Convert a raw ECU value to its physical value.
    ///
    /// Supported are IDENTICAL, LINEAR and RAT_FUNC when the rational function is linear, i.e.
    /// when `a`, `d` and `e` are zero. RAT_FUNC maps the physical value to the raw value, so it
    /// is inverted here.
    pub fn to_physical(&self, raw: f64) -> Result<f64, CalibrationError> {
        match self.conversion_type {
            Some(ConversionType::Identical) => Ok(raw),
            Some(ConversionType::Linear) => {
                let coeffs = self.coeffs_linear.as_ref();
                match coeffs.and_then(|c| Some((c.a?, c.b?))) {
                    Some((a, b)) => Ok(a * raw + b),
                    None => Err(self.unsupported()),
                }
            }
            Some(ConversionType::RatFunc) => {
                let coeffs = self.coeffs.as_ref().and_then(|c| {
                    Some((c.a?, c.b?, c.c?, c.d?, c.e?, c.f?))
                });
                match coeffs {
                    // raw = (b * phys + c) / f
                    Some((a, b, c, d, e, f)) if a == 0.0 && d == 0.0 && e == 0.0 && b != 0.0 => {
                        Ok((raw * f - c) / b)
                    }
                    _ => Err(self.unsupported()),
                }
            }
            _ => Err(self.unsupported()),
        }
    }

    fn unsupported(&self) -> CalibrationError {
        CalibrationError::UnsupportedConversion {
            name: self.name.clone(),
            conversion_type: self
                .conversion_type
                .map_or_else(|| "<none>".to_string(), |ct| ct.to_string()),
        }
    }
}
