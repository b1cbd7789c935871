//! The opportunity-type catalog: medical specialties plus general
//! work-type codes.
//!
//! The uppercase identifier returned by [`OpportunityType::as_str`] is the
//! canonical on-disk form. On PostgreSQL these identifiers are the members
//! of the `opportunitytype` enumerated type; on the embedded backend they
//! are stored as plain strings. The schema subsystem treats
//! [`required_members`] as the source of truth when repairing a database
//! whose catalog lags this list.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the backend enumerated type managed by the schema subsystem.
pub const OPPORTUNITY_TYPE_NAME: &str = "opportunitytype";

// ============================================================================
// OPPORTUNITY TYPE
// ============================================================================

/// Opportunity classification: a closed set of medical-specialty codes
/// plus general work-type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpportunityType {
    AerospaceMedicine,
    Anesthesiology,
    ChildNeurology,
    Dermatology,
    EmergencyMedicine,
    FamilyMedicine,
    GeneralSurgery,
    InternalMedicine,
    InterventionalRadiology,
    MedicalGenetics,
    NeurologicalSurgery,
    Neurology,
    NonClinicalOther,
    NuclearMedicine,
    ObstetricsGynecology,
    OccupationalEnvironmentalMedicine,
    OrthopaedicSurgery,
    Otolaryngology,
    Pathology,
    Pediatrics,
    PhysicalMedicineRehabilitation,
    PlasticSurgery,
    Psychiatry,
    RadiationOncology,
    RadiologyDiagnostic,
    ThoracicSurgery,
    Urology,
    VascularSurgery,
}

impl OpportunityType {
    /// Every variant, in canonical (lexicographic) order.
    pub const ALL: [OpportunityType; 28] = [
        OpportunityType::AerospaceMedicine,
        OpportunityType::Anesthesiology,
        OpportunityType::ChildNeurology,
        OpportunityType::Dermatology,
        OpportunityType::EmergencyMedicine,
        OpportunityType::FamilyMedicine,
        OpportunityType::GeneralSurgery,
        OpportunityType::InternalMedicine,
        OpportunityType::InterventionalRadiology,
        OpportunityType::MedicalGenetics,
        OpportunityType::NeurologicalSurgery,
        OpportunityType::Neurology,
        OpportunityType::NonClinicalOther,
        OpportunityType::NuclearMedicine,
        OpportunityType::ObstetricsGynecology,
        OpportunityType::OccupationalEnvironmentalMedicine,
        OpportunityType::OrthopaedicSurgery,
        OpportunityType::Otolaryngology,
        OpportunityType::Pathology,
        OpportunityType::Pediatrics,
        OpportunityType::PhysicalMedicineRehabilitation,
        OpportunityType::PlasticSurgery,
        OpportunityType::Psychiatry,
        OpportunityType::RadiationOncology,
        OpportunityType::RadiologyDiagnostic,
        OpportunityType::ThoracicSurgery,
        OpportunityType::Urology,
        OpportunityType::VascularSurgery,
    ];

    /// Canonical uppercase identifier as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            OpportunityType::AerospaceMedicine => "AEROSPACE_MEDICINE",
            OpportunityType::Anesthesiology => "ANESTHESIOLOGY",
            OpportunityType::ChildNeurology => "CHILD_NEUROLOGY",
            OpportunityType::Dermatology => "DERMATOLOGY",
            OpportunityType::EmergencyMedicine => "EMERGENCY_MEDICINE",
            OpportunityType::FamilyMedicine => "FAMILY_MEDICINE",
            OpportunityType::GeneralSurgery => "GENERAL_SURGERY",
            OpportunityType::InternalMedicine => "INTERNAL_MEDICINE",
            OpportunityType::InterventionalRadiology => "INTERVENTIONAL_RADIOLOGY",
            OpportunityType::MedicalGenetics => "MEDICAL_GENETICS",
            OpportunityType::NeurologicalSurgery => "NEUROLOGICAL_SURGERY",
            OpportunityType::Neurology => "NEUROLOGY",
            OpportunityType::NonClinicalOther => "NON_CLINICAL_OTHER",
            OpportunityType::NuclearMedicine => "NUCLEAR_MEDICINE",
            OpportunityType::ObstetricsGynecology => "OBSTETRICS_GYNECOLOGY",
            OpportunityType::OccupationalEnvironmentalMedicine => {
                "OCCUPATIONAL_ENVIRONMENTAL_MEDICINE"
            }
            OpportunityType::OrthopaedicSurgery => "ORTHOPAEDIC_SURGERY",
            OpportunityType::Otolaryngology => "OTOLARYNGOLOGY",
            OpportunityType::Pathology => "PATHOLOGY",
            OpportunityType::Pediatrics => "PEDIATRICS",
            OpportunityType::PhysicalMedicineRehabilitation => {
                "PHYSICAL_MEDICINE_REHABILITATION"
            }
            OpportunityType::PlasticSurgery => "PLASTIC_SURGERY",
            OpportunityType::Psychiatry => "PSYCHIATRY",
            OpportunityType::RadiationOncology => "RADIATION_ONCOLOGY",
            OpportunityType::RadiologyDiagnostic => "RADIOLOGY_DIAGNOSTIC",
            OpportunityType::ThoracicSurgery => "THORACIC_SURGERY",
            OpportunityType::Urology => "UROLOGY",
            OpportunityType::VascularSurgery => "VASCULAR_SURGERY",
        }
    }
}

impl fmt::Display for OpportunityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure to parse an [`OpportunityType`] from its database identifier.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown opportunity type: {0}")]
pub struct ParseOpportunityTypeError(pub String);

impl FromStr for OpportunityType {
    type Err = ParseOpportunityTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OpportunityType::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| ParseOpportunityTypeError(s.to_string()))
    }
}

// ============================================================================
// REQUIRED MEMBERS / LEGACY MAPPING
// ============================================================================

/// The full member set the backend enumerated type must contain.
pub fn required_members() -> Vec<&'static str> {
    OpportunityType::ALL.iter().map(|t| t.as_str()).collect()
}

/// Retired members still observed in legacy databases, paired with the
/// current member their rows are folded onto. Every target is required to
/// be an element of [`required_members`].
pub fn legacy_mapping() -> &'static [(&'static str, &'static str)] {
    &[
        ("IN_PERSON_CONTRAST", "RADIOLOGY_DIAGNOSTIC"),
        ("TELE_CONTRAST", "RADIOLOGY_DIAGNOSTIC"),
        ("DIAGNOSTIC_INTERPRETATION", "RADIOLOGY_DIAGNOSTIC"),
        ("TELE_DIAGNOSTIC_INTERPRETATION", "RADIOLOGY_DIAGNOSTIC"),
        ("CONSULTING_OTHER", "RADIOLOGY_DIAGNOSTIC"),
    ]
}
