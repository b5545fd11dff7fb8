use ordered_float::OrderedFloat;
use serde::{ser::SerializeMap, Serialize, Serializer};

/// Predicted next-hour energy (kWh) per model, in model slot order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PredictionSet {
    entries: Vec<(String, f64)>,
}

impl PredictionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a prediction. A repeated name replaces the earlier value in place.
    pub fn insert(&mut self, model: impl Into<String>, kwh: f64) {
        let model = model.into();
        match self.entries.iter_mut().find(|(name, _)| *name == model) {
            Some(entry) => entry.1 = kwh,
            None => self.entries.push((model, kwh)),
        }
    }

    pub fn get(&self, model: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|(name, _)| name == model)
            .map(|(_, kwh)| *kwh)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|(name, kwh)| (name.as_str(), *kwh))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Lowest prediction. Ties go to the entry inserted first.
    pub fn minimum(&self) -> Option<(&str, f64)> {
        self.iter().min_by_key(|(_, kwh)| OrderedFloat(*kwh))
    }

    pub fn maximum(&self) -> Option<f64> {
        self.iter().map(|(_, kwh)| OrderedFloat(kwh)).max().map(|v| v.0)
    }
}

impl Serialize for PredictionSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, kwh) in &self.entries {
            map.serialize_entry(name, kwh)?;
        }
        map.end()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for PredictionSet {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (name, kwh) in iter {
            set.insert(name, kwh);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimum_picks_lowest() {
        let set: PredictionSet = [
            ("XGBoost", 31.2),
            ("Random Forest", 28.9),
            ("LightGBM", 40.0),
        ]
        .into_iter()
        .collect();

        assert_eq!(set.minimum(), Some(("Random Forest", 28.9)));
        assert_eq!(set.maximum(), Some(40.0));
    }

    #[test]
    fn test_minimum_tie_goes_to_first_inserted() {
        let set: PredictionSet = [("XGBoost", 30.0), ("LightGBM", 20.0), ("CatBoost", 20.0)]
            .into_iter()
            .collect();

        assert_eq!(set.minimum(), Some(("LightGBM", 20.0)));
    }

    #[test]
    fn test_empty_set_has_no_minimum() {
        assert!(PredictionSet::new().minimum().is_none());
    }

    #[test]
    fn test_serializes_in_insertion_order() {
        let set: PredictionSet = [("XGBoost", 1.5), ("CatBoost", 0.5)].into_iter().collect();
        let json = serde_json::to_string(&set).unwrap();
        assert_eq!(json, r#"{"XGBoost":1.5,"CatBoost":0.5}"#);
    }

    #[test]
    fn test_insert_replaces_existing() {
        let mut set = PredictionSet::new();
        set.insert("XGBoost", 10.0);
        set.insert("XGBoost", 12.0);
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("XGBoost"), Some(12.0));
    }
}
