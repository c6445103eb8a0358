//! Advisory hazard checks over a computed path.
//!
//! Validators only annotate a route with warnings; they never alter the path or
//! its distance.

use std::sync::Arc;

use crate::port::Port;

/// Hazard check over an ordered port path.
///
/// Implementations must be side-effect free and return an empty list when
/// nothing is flagged.
pub trait SafetyValidator: Send + Sync {
    fn validate(&self, path: &[Port]) -> Vec<String>;
}

/// Flags nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHazards;

impl SafetyValidator for NoHazards {
    fn validate(&self, _path: &[Port]) -> Vec<String> {
        Vec::new()
    }
}

/// Warns about ports at or beyond a latitude where sea ice is expected.
#[derive(Debug, Clone, Copy)]
pub struct PolarWatersValidator {
    pub latitude_limit: f64,
}

impl PolarWatersValidator {
    pub const DEFAULT_LATITUDE_LIMIT: f64 = 66.5;

    pub fn new(latitude_limit: f64) -> Self {
        Self { latitude_limit }
    }
}

impl Default for PolarWatersValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_LATITUDE_LIMIT)
    }
}

impl SafetyValidator for PolarWatersValidator {
    fn validate(&self, path: &[Port]) -> Vec<String> {
        let mut warned: Vec<&str> = Vec::new();
        let mut warnings = Vec::new();
        for port in path {
            let latitude = port.coordinates.latitude;
            if latitude.abs() < self.latitude_limit || warned.contains(&port.name.as_str()) {
                continue;
            }
            warned.push(&port.name);
            let hemisphere = if latitude >= 0.0 { "Arctic" } else { "Antarctic" };
            warnings.push(format!(
                "{} lies in {hemisphere} waters (latitude {latitude:.2}); expect ice restrictions",
                port.name
            ));
        }
        warnings
    }
}

/// Runs several validators and concatenates their warnings in order.
#[derive(Clone, Default)]
pub struct CompositeValidator {
    validators: Vec<Arc<dyn SafetyValidator>>,
}

impl CompositeValidator {
    pub fn new(validators: Vec<Arc<dyn SafetyValidator>>) -> Self {
        Self { validators }
    }

    pub fn push(mut self, validator: Arc<dyn SafetyValidator>) -> Self {
        self.validators.push(validator);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }
}

impl SafetyValidator for CompositeValidator {
    fn validate(&self, path: &[Port]) -> Vec<String> {
        self.validators
            .iter()
            .flat_map(|validator| validator.validate(path))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::Coordinates;

    fn port(name: &str, latitude: f64) -> Port {
        Port::new(name, "Test", Coordinates::new(latitude, 0.0))
    }

    struct Fixed(&'static str);

    impl SafetyValidator for Fixed {
        fn validate(&self, _path: &[Port]) -> Vec<String> {
            vec![self.0.to_string()]
        }
    }

    #[test]
    fn polar_validator_warns_once_per_port() {
        let path = [
            port("Murmansk", 68.97),
            port("Callao", -12.05),
            port("McMurdo", -77.85),
            port("Murmansk", 68.97),
        ];
        let warnings = PolarWatersValidator::default().validate(&path);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].starts_with("Murmansk lies in Arctic"));
        assert!(warnings[1].starts_with("McMurdo lies in Antarctic"));
    }

    #[test]
    fn composite_keeps_validator_order() {
        let composite = CompositeValidator::default()
            .push(Arc::new(Fixed("first")))
            .push(Arc::new(NoHazards))
            .push(Arc::new(Fixed("second")));
        assert_eq!(composite.validate(&[]), vec!["first", "second"]);
        assert!(NoHazards.validate(&[port("Callao", -12.05)]).is_empty());
    }
}
