use crate::config::engine_config::ToxicologyConfig;
use crate::domain::model::{DermalSafety, DoseAssessment, ToxicityValue};
use std::str::FromStr;

/// Body-surface conversion factor (Km) for an adult human.
pub const HUMAN_KM: f64 = 37.0;

const RELEVANT_ROUTES: [&str; 5] = ["oral", "dermal", "gavage", "diet", "drinking water"];
const MG_PER_KG_UNITS: [&str; 5] = ["mg/kg", "mg/kg-day", "mg/kg/day", "mg/kg bw/day", "mg/kg-bw/day"];

/// Toxicity endpoints usable for a dose conversion, in order of preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ToxicityKind {
    Noael,
    Noel,
    Nel,
    Loael,
    Loel,
    Lel,
    Ld50,
}

impl ToxicityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToxicityKind::Noael => "NOAEL",
            ToxicityKind::Noel => "NOEL",
            ToxicityKind::Nel => "NEL",
            ToxicityKind::Loael => "LOAEL",
            ToxicityKind::Loel => "LOEL",
            ToxicityKind::Lel => "LEL",
            ToxicityKind::Ld50 => "LD50",
        }
    }
}

impl FromStr for ToxicityKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "NOAEL" => Ok(ToxicityKind::Noael),
            "NOEL" => Ok(ToxicityKind::Noel),
            "NEL" => Ok(ToxicityKind::Nel),
            "LOAEL" => Ok(ToxicityKind::Loael),
            "LOEL" => Ok(ToxicityKind::Loel),
            "LEL" => Ok(ToxicityKind::Lel),
            "LD50" => Ok(ToxicityKind::Ld50),
            other => Err(format!("unsupported toxicity type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Mouse,
    Hamster,
    Rat,
    Ferret,
    GuineaPig,
    Rabbit,
    Dog,
    MonkeyRhesus,
    Marmoset,
    SquirrelMonkey,
    Baboon,
    MicroPig,
    MiniPig,
    Human,
}

impl Species {
    pub fn km_factor(&self) -> f64 {
        match self {
            Species::Human => HUMAN_KM,
            Species::Mouse => 3.0,
            Species::Hamster => 5.0,
            Species::Rat => 6.0,
            Species::Ferret => 7.0,
            Species::GuineaPig => 8.0,
            Species::Rabbit => 12.0,
            Species::Dog => 20.0,
            Species::MonkeyRhesus => 12.0,
            Species::Marmoset => 6.0,
            Species::SquirrelMonkey => 7.0,
            Species::Baboon => 20.0,
            Species::MicroPig => 27.0,
            Species::MiniPig => 35.0,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Species::Mouse => "mouse",
            Species::Hamster => "hamster",
            Species::Rat => "rat",
            Species::Ferret => "ferret",
            Species::GuineaPig => "guinea_pig",
            Species::Rabbit => "rabbit",
            Species::Dog => "dog",
            Species::MonkeyRhesus => "monkey_rhesus",
            Species::Marmoset => "marmoset",
            Species::SquirrelMonkey => "squirrel_monkey",
            Species::Baboon => "baboon",
            Species::MicroPig => "micro_pig",
            Species::MiniPig => "mini_pig",
            Species::Human => "human",
        }
    }
}

impl FromStr for Species {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace('_', " ");
        match normalized.as_str() {
            "mouse" => Ok(Species::Mouse),
            "hamster" => Ok(Species::Hamster),
            "rat" => Ok(Species::Rat),
            "ferret" => Ok(Species::Ferret),
            "guinea pig" => Ok(Species::GuineaPig),
            "rabbit" => Ok(Species::Rabbit),
            "dog" => Ok(Species::Dog),
            "monkey" | "rhesus" | "monkey rhesus" => Ok(Species::MonkeyRhesus),
            "marmoset" => Ok(Species::Marmoset),
            "squirrel monkey" => Ok(Species::SquirrelMonkey),
            "baboon" => Ok(Species::Baboon),
            "micro pig" => Ok(Species::MicroPig),
            "mini pig" => Ok(Species::MiniPig),
            "human" => Ok(Species::Human),
            other => Err(format!("unknown species '{}'", other)),
        }
    }
}

/// Km-based conversion: HED (mg/kg) = animal dose (mg/kg) x Km_animal / Km_human.
pub fn human_equivalent_dose(animal_dose_mg_kg: f64, species: Species) -> f64 {
    animal_dose_mg_kg * species.km_factor() / HUMAN_KM
}

/// Dose in mg/kg, or `None` when the unit cannot be converted.
/// mL/kg is read as a water-like density of 1 g/mL.
fn dose_mg_kg(value: f64, unit: &str) -> Option<f64> {
    let unit = unit.trim().to_lowercase();
    if MG_PER_KG_UNITS.contains(&unit.as_str()) {
        Some(value)
    } else if unit.starts_with("ml/kg") {
        Some(value * 1000.0)
    } else {
        None
    }
}

pub fn classify(safe_concentration_percent: f64) -> DermalSafety {
    match safe_concentration_percent {
        p if p > 100.0 => DermalSafety::SafeAtAnyConcentration,
        p if p > 10.0 => DermalSafety::SafeAtTypicalUse,
        p if p > 1.0 => DermalSafety::SafeWithLimits,
        p if p > 0.1 => DermalSafety::RequiresCarefulFormulation,
        _ => DermalSafety::HighRisk,
    }
}

struct Candidate {
    kind: ToxicityKind,
    species: Species,
    route: String,
    dose_mg_kg: f64,
    hed_mg_kg: f64,
}

/// Turns animal toxicity values into a human equivalent dose and a safe
/// dermal concentration.
#[derive(Debug, Clone, Default)]
pub struct DoseAssessor {
    config: ToxicologyConfig,
}

impl DoseAssessor {
    pub fn new(config: &ToxicologyConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn caution_at(&self) -> DermalSafety {
        self.config.caution_at
    }

    fn candidate(&self, value: &ToxicityValue) -> Option<Candidate> {
        let kind = value.kind.parse::<ToxicityKind>().ok()?;
        let species = value.species.parse::<Species>().ok()?;
        // 人體數據本身就是人體劑量
        if species == Species::Human {
            return None;
        }
        let route = value.route.trim().to_lowercase();
        if !RELEVANT_ROUTES.contains(&route.as_str()) {
            return None;
        }
        if !value.value.is_finite() || value.value <= 0.0 {
            return None;
        }
        let dose_mg_kg = dose_mg_kg(value.value, &value.unit)?;

        Some(Candidate {
            kind,
            species,
            route,
            dose_mg_kg,
            hed_mg_kg: human_equivalent_dose(dose_mg_kg, species),
        })
    }

    /// Picks the lowest HED among relevant values; equal doses prefer the
    /// better endpoint (NOAEL before LD50). `None` when nothing is usable.
    pub fn assess(&self, values: &[ToxicityValue]) -> Option<DoseAssessment> {
        let chosen = values
            .iter()
            .filter_map(|value| self.candidate(value))
            .min_by(|a, b| {
                a.hed_mg_kg
                    .total_cmp(&b.hed_mg_kg)
                    .then_with(|| a.kind.cmp(&b.kind))
            })?;

        let config = &self.config;
        let total_safe_dose_mg = chosen.hed_mg_kg * config.human_weight_kg;
        let with_safety_factor_mg = total_safe_dose_mg / config.safety_factor;
        let max_dermal_mg = with_safety_factor_mg / (config.skin_penetration_percent / 100.0);
        // mg/cm² 換算成 % w/w，假設密度 1 g/cm³
        let safe_concentration_percent = max_dermal_mg / config.application_area_cm2 / 10.0;

        Some(DoseAssessment {
            toxicity_type: chosen.kind.as_str().to_string(),
            species: chosen.species.as_str().to_string(),
            route: chosen.route,
            source_value_mg_kg: chosen.dose_mg_kg,
            hed_mg_kg: chosen.hed_mg_kg,
            total_safe_dose_mg,
            safe_concentration_percent,
            safety: classify(safe_concentration_percent),
        })
    }
}
