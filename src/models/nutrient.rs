use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::str::FromStr;

/// Identifier of a nutrient tracked in the diary.
///
/// Known nutrients get their own variant; anything else coming from the
/// catalog is kept as `Custom` so no data is dropped.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NutrientKey {
    Calories,
    Proteins,
    Carbohydrates,
    Fat,
    SaturatedFat,
    MonounsaturatedFat,
    PolyunsaturatedFat,
    TransFat,
    Omega3Fat,
    Cholesterol,
    Sugars,
    Fiber,
    Sodium,
    Salt,
    Potassium,
    VitaminA,
    VitaminD,
    VitaminE,
    VitaminK,
    VitaminC,
    VitaminB1,
    VitaminB2,
    VitaminB6,
    VitaminB9,
    VitaminB12,
    Chloride,
    Calcium,
    Iron,
    Magnesium,
    Zinc,
    Caffeine,
    Alcohol,
    Sucrose,
    Glucose,
    Fructose,
    Lactose,
    Custom(String),
}

impl NutrientKey {
    pub const KNOWN: [NutrientKey; 36] = [
        NutrientKey::Calories,
        NutrientKey::Proteins,
        NutrientKey::Carbohydrates,
        NutrientKey::Fat,
        NutrientKey::SaturatedFat,
        NutrientKey::MonounsaturatedFat,
        NutrientKey::PolyunsaturatedFat,
        NutrientKey::TransFat,
        NutrientKey::Omega3Fat,
        NutrientKey::Cholesterol,
        NutrientKey::Sugars,
        NutrientKey::Fiber,
        NutrientKey::Sodium,
        NutrientKey::Salt,
        NutrientKey::Potassium,
        NutrientKey::VitaminA,
        NutrientKey::VitaminD,
        NutrientKey::VitaminE,
        NutrientKey::VitaminK,
        NutrientKey::VitaminC,
        NutrientKey::VitaminB1,
        NutrientKey::VitaminB2,
        NutrientKey::VitaminB6,
        NutrientKey::VitaminB9,
        NutrientKey::VitaminB12,
        NutrientKey::Chloride,
        NutrientKey::Calcium,
        NutrientKey::Iron,
        NutrientKey::Magnesium,
        NutrientKey::Zinc,
        NutrientKey::Caffeine,
        NutrientKey::Alcohol,
        NutrientKey::Sucrose,
        NutrientKey::Glucose,
        NutrientKey::Fructose,
        NutrientKey::Lactose,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            NutrientKey::Calories => "calories",
            NutrientKey::Proteins => "proteins",
            NutrientKey::Carbohydrates => "carbohydrates",
            NutrientKey::Fat => "fat",
            NutrientKey::SaturatedFat => "saturated-fat",
            NutrientKey::MonounsaturatedFat => "monounsaturated-fat",
            NutrientKey::PolyunsaturatedFat => "polyunsaturated-fat",
            NutrientKey::TransFat => "trans-fat",
            NutrientKey::Omega3Fat => "omega-3-fat",
            NutrientKey::Cholesterol => "cholesterol",
            NutrientKey::Sugars => "sugars",
            NutrientKey::Fiber => "fiber",
            NutrientKey::Sodium => "sodium",
            NutrientKey::Salt => "salt",
            NutrientKey::Potassium => "potassium",
            NutrientKey::VitaminA => "vitamin-a",
            NutrientKey::VitaminD => "vitamin-d",
            NutrientKey::VitaminE => "vitamin-e",
            NutrientKey::VitaminK => "vitamin-k",
            NutrientKey::VitaminC => "vitamin-c",
            NutrientKey::VitaminB1 => "vitamin-b1",
            NutrientKey::VitaminB2 => "vitamin-b2",
            NutrientKey::VitaminB6 => "vitamin-b6",
            NutrientKey::VitaminB9 => "vitamin-b9",
            NutrientKey::VitaminB12 => "vitamin-b12",
            NutrientKey::Chloride => "chloride",
            NutrientKey::Calcium => "calcium",
            NutrientKey::Iron => "iron",
            NutrientKey::Magnesium => "magnesium",
            NutrientKey::Zinc => "zinc",
            NutrientKey::Caffeine => "caffeine",
            NutrientKey::Alcohol => "alcohol",
            NutrientKey::Sucrose => "sucrose",
            NutrientKey::Glucose => "glucose",
            NutrientKey::Fructose => "fructose",
            NutrientKey::Lactose => "lactose",
            NutrientKey::Custom(name) => name,
        }
    }

    /// Display unit. Custom nutrients have no known unit.
    pub fn unit(&self) -> &'static str {
        match self {
            NutrientKey::Calories => "kcal",
            NutrientKey::Cholesterol
            | NutrientKey::Sodium
            | NutrientKey::Potassium
            | NutrientKey::Calcium
            | NutrientKey::Iron
            | NutrientKey::Magnesium
            | NutrientKey::Zinc
            | NutrientKey::VitaminE
            | NutrientKey::VitaminC
            | NutrientKey::VitaminB1
            | NutrientKey::VitaminB2
            | NutrientKey::VitaminB6 => "mg",
            NutrientKey::VitaminA
            | NutrientKey::VitaminD
            | NutrientKey::VitaminK
            | NutrientKey::VitaminB9
            | NutrientKey::VitaminB12 => "µg",
            NutrientKey::Alcohol => "%",
            NutrientKey::Custom(_) => "",
            _ => "g",
        }
    }

    /// Resolve a nutrient name, accepting `_` in place of `-` and any case.
    pub fn from_name(name: &str) -> Self {
        let normalized = name.trim().to_lowercase().replace('_', "-");
        NutrientKey::KNOWN
            .iter()
            .find(|key| key.as_str() == normalized)
            .cloned()
            .unwrap_or_else(|| NutrientKey::Custom(name.trim().to_string()))
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, NutrientKey::Custom(_))
    }
}

impl fmt::Display for NutrientKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NutrientKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(NutrientKey::from_name(s))
    }
}

impl Serialize for NutrientKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for NutrientKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(NutrientKey::from_name(&raw))
    }
}

/// A single nutrient amount, as stored against a catalog food.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Nutrient {
    pub key: NutrientKey,
    pub amount: f64,
}

impl Nutrient {
    pub fn new(key: NutrientKey, amount: f64) -> Self {
        Self { key, amount }
    }
}

impl fmt::Display for Nutrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let unit = self.key.unit();
        if unit.is_empty() {
            write!(f, "{}: {}", self.key, self.amount)
        } else {
            write!(f, "{}: {} {}", self.key, self.amount, unit)
        }
    }
}

/// Nutrient totals keyed by nutrient. Missing keys read as zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NutritionMap(BTreeMap<NutrientKey, f64>);

impl NutritionMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &NutrientKey) -> f64 {
        self.0.get(key).copied().unwrap_or(0.0)
    }

    /// Add `amount` to `key`, starting from zero for unseen keys.
    pub fn add(&mut self, key: NutrientKey, amount: f64) {
        *self.0.entry(key).or_insert(0.0) += amount;
    }

    /// Fold every value of `other` into this map.
    pub fn merge(&mut self, other: &NutritionMap) {
        for (key, amount) in &other.0 {
            self.add(key.clone(), *amount);
        }
    }

    pub fn scaled(&self, factor: f64) -> NutritionMap {
        self.0
            .iter()
            .map(|(key, amount)| (key.clone(), amount * factor))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&NutrientKey, &f64)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Same amounts for every nutrient, up to rounding noise. Missing keys
    /// count as zero.
    pub fn approx_eq(&self, other: &NutritionMap) -> bool {
        self.0
            .keys()
            .chain(other.0.keys())
            .all(|key| {
                let (a, b) = (self.get(key), other.get(key));
                (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
            })
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

impl FromIterator<(NutrientKey, f64)> for NutritionMap {
    fn from_iter<I: IntoIterator<Item = (NutrientKey, f64)>>(iter: I) -> Self {
        let mut map = NutritionMap::new();
        for (key, amount) in iter {
            map.add(key, amount);
        }
        map
    }
}

impl<'a> Sum<&'a NutritionMap> for NutritionMap {
    fn sum<I: Iterator<Item = &'a NutritionMap>>(iter: I) -> Self {
        let mut total = NutritionMap::new();
        for map in iter {
            total.merge(map);
        }
        total
    }
}
