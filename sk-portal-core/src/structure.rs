//! Organizational structure catalogue: categories, bureaus and the standard
//! role titles available in each category.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::workflow::ParseEnumError;

/// Number of branch coordinator slots offered by default.
pub const BRANCH_COORDINATOR_SLOTS: usize = 10;

/// Organizational tier an officer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureCategory {
    AdvisoryBoard,
    ExpertBoard,
    ExecutiveBoard,
    /// Requires a [`Bureau`] selection.
    Bureaus,
    BranchCoordinators,
}

impl StructureCategory {
    pub const ALL: [StructureCategory; 5] = [
        Self::AdvisoryBoard,
        Self::ExpertBoard,
        Self::ExecutiveBoard,
        Self::Bureaus,
        Self::BranchCoordinators,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AdvisoryBoard => "advisory_board",
            Self::ExpertBoard => "expert_board",
            Self::ExecutiveBoard => "executive_board",
            Self::Bureaus => "bureaus",
            Self::BranchCoordinators => "branch_coordinators",
        }
    }

    /// Name used on the decree.
    pub fn label(&self) -> &'static str {
        match self {
            Self::AdvisoryBoard => "Dewan Penasehat",
            Self::ExpertBoard => "Dewan Pakar",
            Self::ExecutiveBoard => "Dewan Pengurus Harian",
            Self::Bureaus => "Biro-Biro",
            Self::BranchCoordinators => "Koordinator Cabang",
        }
    }

    pub fn requires_bureau(&self) -> bool {
        matches!(self, Self::Bureaus)
    }

    /// Standard titles for this category, in decree order.
    pub fn standard_titles(&self) -> Vec<String> {
        let fixed: &[&str] = match self {
            Self::AdvisoryBoard | Self::ExpertBoard => BOARD_TITLES,
            Self::ExecutiveBoard => EXECUTIVE_BOARD_TITLES,
            Self::Bureaus => BUREAU_TITLES,
            Self::BranchCoordinators => {
                return (1..=BRANCH_COORDINATOR_SLOTS)
                    .map(|n| format!("Koordinator Cabang {}", n))
                    .collect();
            }
        };
        fixed.iter().map(|t| t.to_string()).collect()
    }

    /// Returns true if `title` is one of the standard titles (case-insensitive).
    pub fn is_standard_title(&self, title: &str) -> bool {
        self.standard_titles()
            .iter()
            .any(|t| t.eq_ignore_ascii_case(title.trim()))
    }
}

impl fmt::Display for StructureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for StructureCategory {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "structure category",
                value: s.to_string(),
            })
    }
}

/// Sub-division of the bureaus category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bureau {
    OrganizationCadre,
    EducationReligion,
    LawHumanRights,
    CivilizationCulture,
    YouthSportsArts,
    LabourMigrantWorkers,
    WomenChildren,
    ProfessionalCommunities,
    ItCyberMedia,
    EconomyCooperatives,
    Environment,
    AgrarianFarmersFishers,
}

impl Bureau {
    pub const ALL: [Bureau; 12] = [
        Self::OrganizationCadre,
        Self::EducationReligion,
        Self::LawHumanRights,
        Self::CivilizationCulture,
        Self::YouthSportsArts,
        Self::LabourMigrantWorkers,
        Self::WomenChildren,
        Self::ProfessionalCommunities,
        Self::ItCyberMedia,
        Self::EconomyCooperatives,
        Self::Environment,
        Self::AgrarianFarmersFishers,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OrganizationCadre => "organization_cadre",
            Self::EducationReligion => "education_religion",
            Self::LawHumanRights => "law_human_rights",
            Self::CivilizationCulture => "civilization_culture",
            Self::YouthSportsArts => "youth_sports_arts",
            Self::LabourMigrantWorkers => "labour_migrant_workers",
            Self::WomenChildren => "women_children",
            Self::ProfessionalCommunities => "professional_communities",
            Self::ItCyberMedia => "it_cyber_media",
            Self::EconomyCooperatives => "economy_cooperatives",
            Self::Environment => "environment",
            Self::AgrarianFarmersFishers => "agrarian_farmers_fishers",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::OrganizationCadre => "Biro Organisasi, Kaderisasi dan Keanggotaan",
            Self::EducationReligion => "Biro Pendidikan dan Agama",
            Self::LawHumanRights => "Biro Hukum, HAM & Advokasi",
            Self::CivilizationCulture => "Biro Peradaban & Kebudayaan",
            Self::YouthSportsArts => "Biro Milenial, Pemuda, Olahraga dan Seni",
            Self::LabourMigrantWorkers => "Biro Ketenagakerjaan dan Pekerja Migran Indonesia",
            Self::WomenChildren => "Biro Perempuan dan Anak",
            Self::ProfessionalCommunities => "Biro Penggalangan Kelompok Profesi dan Komunitas",
            Self::ItCyberMedia => "Biro IT, Cyber & Media Publikasi",
            Self::EconomyCooperatives => "Biro Pemberdayaan Ekonomi, Koperasi dan UMKM",
            Self::Environment => "Biro Lingkungan Hidup",
            Self::AgrarianFarmersFishers => "Biro Agraria, Pertanian dan Nelayan",
        }
    }
}

impl fmt::Display for Bureau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Bureau {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "bureau",
                value: s.to_string(),
            })
    }
}

const BOARD_TITLES: &[&str] = &["Ketua", "Wakil Ketua", "Sekretaris", "Anggota 1", "Anggota 2"];

const BUREAU_TITLES: &[&str] = &["Ketua", "Sekretaris", "Anggota 1", "Anggota 2"];

const EXECUTIVE_BOARD_TITLES: &[&str] = &[
    "Ketua DPD",
    "Wakil Ketua Bid. Organisasi, Kaderisasi dan Keanggotaan",
    "Wakil Ketua Bid. Pemenangan Pemilu",
    "Wakil Ketua Bid. Perencanaan Kebijakan Strategis",
    "Wakil Ketua Bid. Hukum, HAM dan Advokasi Rakyat",
    "Wakil Ketua Bid. Peradaban & Kebudayaan",
    "Wakil Ketua Bid. Ekonomi Sosial & Kesejahteraan Rakyat",
    "Wakil Ketua Bid. Pemberdayaan Perempuan dan Perlindungan Anak",
    "Wakil Ketua Bid. Penggalangan Kelompok Profesi & Komunitas",
    "Wakil Ketua Bid. Sumber Daya Alam, Agraria & Lingkungan Hidup",
    "Wakil Ketua Bid. Kepemudaan & Penggalangan Pemilih Pemula",
    "Wakil Ketua Bid. Keagamaan",
    "Wakil Ketua Bid. Hubungan Antar Lembaga",
    "Wakil Ketua Bid. IT, Cyber dan Media Sosial",
    "Sekretaris DPD",
    "Wakil Sekretaris Bid. Internal / Kepala Sekretariat",
    "Wakil Sekretaris Bid. Organisasi, Kaderisasi dan Keanggotaan",
    "Wakil Sekretaris Bid. Pemenangan Pemilu",
    "Wakil Sekretaris Bid. Perencanaan Kebijakan Strategis",
    "Wakil Sekretaris Bid. Hukum, HAM dan Advokasi Rakyat",
    "Wakil Sekretaris Bid. Peradaban & Kebudayaan",
    "Wakil Sekretaris Bid. Ekonomi Sosial & Kesejahteraan Rakyat",
    "Wakil Sekretaris Bid. Pemberdayaan Perempuan dan Perlindungan Anak",
    "Wakil Sekretaris Bid. Penggalangan Kelompok Profesi & Komunitas",
    "Wakil Sekretaris Bid. Sumber Daya Alam, Agraria & Lingkungan Hidup",
    "Wakil Sekretaris Bid. Kepemudaan & Penggalangan Pemilih Pemula",
    "Wakil Sekretaris Bid. Keagamaan",
    "Wakil Sekretaris Bid. Hubungan Antar Lembaga",
    "Wakil Sekretaris Bid. IT, Cyber dan Media Sosial",
    "Bendahara DPD",
    "Wakil Bendahara Bid. Pembelanjaan Aset Partai",
    "Wakil Bendahara Bid. Pembiayaan Kegiatan Partai",
    "Wakil Bendahara Bid. Pembiayaan Operasional Sekretariat Partai",
];

/// A chapter-specific extra title under one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomTitle {
    pub structure: StructureCategory,
    pub title: String,
}

/// Titles available to a chapter for one category: the standard list
/// followed by the chapter's custom titles.
pub fn available_titles(structure: StructureCategory, custom: &[CustomTitle]) -> Vec<String> {
    let mut titles = structure.standard_titles();
    titles.extend(
        custom
            .iter()
            .filter(|c| c.structure == structure)
            .map(|c| c.title.clone()),
    );
    titles
}

/// Returns true if `title` is allowed for `structure` given the custom titles.
pub fn is_title_allowed(structure: StructureCategory, title: &str, custom: &[CustomTitle]) -> bool {
    let title = title.trim();
    structure.is_standard_title(title)
        || custom
            .iter()
            .any(|c| c.structure == structure && c.title.eq_ignore_ascii_case(title))
}
