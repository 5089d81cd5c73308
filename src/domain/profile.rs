use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Profile snapshot as stored by the profile service. Nulls are allowed everywhere.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserSkinProfile {
    pub age: Option<u32>,
    pub gender: Option<String>,
    pub skin_type: Option<String>,
    pub sensitive_skin: Option<bool>,
    pub atopic_skin: Option<bool>,
    pub acne_prone: Option<bool>,
    pub has_allergies: Option<bool>,
    #[serde(deserialize_with = "null_as_empty")]
    pub cosmetic_allergies: Vec<String>,
    #[serde(deserialize_with = "null_as_empty")]
    pub general_allergies: Vec<String>,
    pub acne_vulgaris: Option<bool>,
    pub psoriasis: Option<bool>,
    pub eczema: Option<bool>,
    pub rosacea: Option<bool>,
    pub photosensitizing_drugs: Option<bool>,
    pub pregnancy: Option<bool>,
    pub stress_level: Option<u8>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkinCondition {
    SensitiveSkin,
    Atopic,
    AcneProne,
    Rosacea,
    Eczema,
    Psoriasis,
    AllergyProne,
}

impl fmt::Display for SkinCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SkinCondition::SensitiveSkin => "sensitive skin",
            SkinCondition::Atopic => "atopic skin",
            SkinCondition::AcneProne => "acne-prone skin",
            SkinCondition::Rosacea => "rosacea",
            SkinCondition::Eczema => "eczema",
            SkinCondition::Psoriasis => "psoriasis",
            SkinCondition::AllergyProne => "declared allergies",
        })
    }
}

impl UserSkinProfile {
    pub fn active_conditions(&self) -> BTreeSet<SkinCondition> {
        let flags = [
            (self.sensitive_skin, SkinCondition::SensitiveSkin),
            (self.atopic_skin, SkinCondition::Atopic),
            (self.acne_prone, SkinCondition::AcneProne),
            (self.acne_vulgaris, SkinCondition::AcneProne),
            (self.rosacea, SkinCondition::Rosacea),
            (self.eczema, SkinCondition::Eczema),
            (self.psoriasis, SkinCondition::Psoriasis),
            (self.has_allergies, SkinCondition::AllergyProne),
        ];

        flags
            .into_iter()
            .filter(|(flag, _)| flag.unwrap_or(false))
            .map(|(_, condition)| condition)
            .collect()
    }

    pub fn takes_photosensitizing_drugs(&self) -> bool {
        self.photosensitizing_drugs.unwrap_or(false)
    }

    pub fn is_pregnant(&self) -> bool {
        self.pregnancy.unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_profile_service_payload() {
        let payload = serde_json::json!({
            "age": 42,
            "gender": "Kobieta",
            "skinType": null,
            "sensitiveSkin": false,
            "atopicSkin": null,
            "acneProne": true,
            "cosmeticAllergies": ["Barwniki"],
            "generalAllergies": null,
            "acneVulgaris": null,
            "photosensitizingDrugs": null,
            "stressLevel": 6,
            "pregnancy": null,
            "smoking": "Okazjonalnie"
        });

        let profile: UserSkinProfile = serde_json::from_value(payload).unwrap();
        assert_eq!(profile.age, Some(42));
        assert_eq!(profile.cosmetic_allergies, vec!["Barwniki".to_string()]);
        assert!(profile.general_allergies.is_empty());
        assert_eq!(profile.stress_level, Some(6));
        assert!(!profile.is_pregnant());
        assert_eq!(
            profile.active_conditions().into_iter().collect::<Vec<_>>(),
            vec![SkinCondition::AcneProne]
        );
    }

    #[test]
    fn test_acne_vulgaris_counts_as_acne_prone() {
        let profile = UserSkinProfile {
            acne_vulgaris: Some(true),
            eczema: Some(true),
            ..Default::default()
        };
        let conditions = profile.active_conditions();
        assert!(conditions.contains(&SkinCondition::AcneProne));
        assert!(conditions.contains(&SkinCondition::Eczema));
        assert_eq!(conditions.len(), 2);
    }
}
