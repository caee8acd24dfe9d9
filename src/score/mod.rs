//! CHA₂DS₂-VASc stroke risk score for atrial fibrillation
//!
//! | Criterion                                   | Points |
//! |---------------------------------------------|--------|
//! | Congestive heart failure                    | 1      |
//! | Hypertension                                | 1      |
//! | Age ≥ 75                                    | 2      |
//! | Diabetes mellitus                           | 1      |
//! | Prior stroke / TIA / thromboembolism        | 2      |
//! | Vascular disease                            | 1      |
//! | Age 65–74                                   | 1      |
//! | Sex category (female)                       | 1      |

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{Error, Result};

pub const MAX_AGE: u32 = 120;

/// Adjusted annual stroke rate (%) indexed by score
const ANNUAL_STROKE_RISK: [f64; 10] = [0.0, 1.3, 2.2, 3.2, 4.0, 6.7, 9.8, 9.6, 6.7, 15.2];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cha2ds2VascRequest {
    /// Age in years
    #[schema(minimum = 0, maximum = 120, example = 72)]
    pub age: u32,
    pub sex: Sex,
    #[serde(default)]
    pub congestive_heart_failure: bool,
    #[serde(default)]
    pub hypertension: bool,
    /// Prior stroke, transient ischaemic attack or thromboembolism
    #[serde(default)]
    pub stroke_tia_thromboembolism: bool,
    /// Prior myocardial infarction, peripheral artery disease or aortic plaque
    #[serde(default)]
    pub vascular_disease: bool,
    #[serde(default)]
    pub diabetes_mellitus: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct Cha2ds2VascResponse {
    #[schema(minimum = 0, maximum = 9, example = 3)]
    pub score: u8,
    pub risk_category: RiskCategory,
    #[schema(example = 3.2)]
    pub annual_stroke_risk_percent: f64,
    /// Criteria that contributed to the score
    pub components: Vec<String>,
}

impl Cha2ds2VascRequest {
    pub fn validate(&self) -> Result<()> {
        if self.age > MAX_AGE {
            return Err(Error::validation(format!(
                "age must be between 0 and {}, got {}",
                MAX_AGE, self.age
            )));
        }
        Ok(())
    }
}

/// Score a validated request
pub fn calculate(request: &Cha2ds2VascRequest) -> Result<Cha2ds2VascResponse> {
    request.validate()?;

    let criteria: [(&str, bool, u8); 8] = [
        ("congestive_heart_failure", request.congestive_heart_failure, 1),
        ("hypertension", request.hypertension, 1),
        ("age_75_or_older", request.age >= 75, 2),
        ("diabetes_mellitus", request.diabetes_mellitus, 1),
        ("stroke_tia_thromboembolism", request.stroke_tia_thromboembolism, 2),
        ("vascular_disease", request.vascular_disease, 1),
        ("age_65_to_74", (65..75).contains(&request.age), 1),
        ("female_sex", request.sex == Sex::Female, 1),
    ];

    let mut score = 0u8;
    let mut components = Vec::new();
    for (name, present, points) in criteria {
        if present {
            score += points;
            components.push(name.to_string());
        }
    }

    Ok(Cha2ds2VascResponse {
        score,
        risk_category: risk_category(score, request.sex),
        annual_stroke_risk_percent: ANNUAL_STROKE_RISK[score as usize],
        components,
    })
}

/// Sex-adjusted risk band. Female sex alone does not raise risk.
pub fn risk_category(score: u8, sex: Sex) -> RiskCategory {
    let adjusted = match sex {
        Sex::Male => score,
        Sex::Female => score.saturating_sub(1),
    };
    match adjusted {
        0 => RiskCategory::Low,
        1 => RiskCategory::Moderate,
        _ => RiskCategory::High,
    }
}
