//! Closed vocabularies shared by the access controller, the upload store and
//! the book assembler.

use serde::Serialize;

/// Document categories, in the order they appear in an assembled book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Cover,
    Memo,
    FrontMatter,
    PersonalInfo,
    Part1DevelopmentAgreement,
    Part2Challenge,
    ExecutiveCommentsSignatures,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Cover,
        Section::Memo,
        Section::FrontMatter,
        Section::PersonalInfo,
        Section::Part1DevelopmentAgreement,
        Section::Part2Challenge,
        Section::ExecutiveCommentsSignatures,
    ];

    /// Directory name under `uploads/<identifier>/`. The numeric prefix keeps
    /// a plain directory listing in book order.
    pub fn dir_name(self) -> &'static str {
        match self {
            Self::Cover => "01_cover",
            Self::Memo => "02_memo",
            Self::FrontMatter => "03_front_matter",
            Self::PersonalInfo => "04_personal_info",
            Self::Part1DevelopmentAgreement => "05_part1_development_agreement",
            Self::Part2Challenge => "06_part2_challenge",
            Self::ExecutiveCommentsSignatures => "07_executive_comments_signatures",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Cover => "Front and back cover",
            Self::Memo => "Memorandum",
            Self::FrontMatter => "Preface and table of contents",
            Self::PersonalInfo => "Personal information",
            Self::Part1DevelopmentAgreement => "Part 1: development agreement",
            Self::Part2Challenge => "Part 2: challenge topic",
            Self::ExecutiveCommentsSignatures => "Executive comments and signatures",
        }
    }

    /// Accepts either the directory name or the snake_case key.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|sec| sec.dir_name() == s || sec.key() == s)
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::Cover => "cover",
            Self::Memo => "memo",
            Self::FrontMatter => "front_matter",
            Self::PersonalInfo => "personal_info",
            Self::Part1DevelopmentAgreement => "part1_development_agreement",
            Self::Part2Challenge => "part2_challenge",
            Self::ExecutiveCommentsSignatures => "executive_comments_signatures",
        }
    }
}

/// Administrable modules of the personnel system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Module {
    Profile,
    Gp7,
    Decorations,
    Awards,
    Promotion,
    Leave,
    Offsite,
    Pa,
    Training,
    TrainingReport,
}

impl Module {
    pub const ALL: [Module; 10] = [
        Module::Profile,
        Module::Gp7,
        Module::Decorations,
        Module::Awards,
        Module::Promotion,
        Module::Leave,
        Module::Offsite,
        Module::Pa,
        Module::Training,
        Module::TrainingReport,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Self::Profile => "profile",
            Self::Gp7 => "gp7",
            Self::Decorations => "decorations",
            Self::Awards => "awards",
            Self::Promotion => "promotion",
            Self::Leave => "leave",
            Self::Offsite => "offsite",
            Self::Pa => "pa",
            Self::Training => "training",
            Self::TrainingReport => "training_report",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Profile => "Personal profile",
            Self::Gp7 => "Service record (GP.7)",
            Self::Decorations => "Royal decorations",
            Self::Awards => "Awards",
            Self::Promotion => "Salary step promotion",
            Self::Leave => "Leave requests",
            Self::Offsite => "Off-campus permission",
            Self::Pa => "Performance agreement (PA)",
            Self::Training => "Official travel and training",
            Self::TrainingReport => "Training reports",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        Self::ALL.into_iter().find(|m| m.key() == s)
    }
}

/// Account role as stored in the roster `role` column.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Teacher,
    ModuleAdmin,
    SuperAdmin,
    Executive,
    /// Empty or unrecognised value. Satisfies no role check.
    Other(String),
}

impl Role {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "teacher" => Self::Teacher,
            "module_admin" => Self::ModuleAdmin,
            "superadmin" => Self::SuperAdmin,
            "executive" => Self::Executive,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Teacher => "teacher",
            Self::ModuleAdmin => "module_admin",
            Self::SuperAdmin => "superadmin",
            Self::Executive => "executive",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Self::ModuleAdmin | Self::SuperAdmin)
    }
}

impl Serialize for Role {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sections_sort_in_book_order() {
        let mut shuffled = vec![Section::Part2Challenge, Section::Cover, Section::Memo];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Section::Cover, Section::Memo, Section::Part2Challenge]
        );
        let dirs: Vec<&str> = Section::ALL.iter().map(|s| s.dir_name()).collect();
        let mut sorted = dirs.clone();
        sorted.sort();
        assert_eq!(dirs, sorted);
    }

    #[test]
    fn section_parse_accepts_dir_and_key() {
        assert_eq!(Section::parse("02_memo"), Some(Section::Memo));
        assert_eq!(Section::parse(" memo "), Some(Section::Memo));
        assert_eq!(Section::parse("99_other"), None);
    }

    #[test]
    fn role_parse_is_case_insensitive() {
        assert_eq!(Role::parse("SuperAdmin"), Role::SuperAdmin);
        assert_eq!(Role::parse(" Module_Admin "), Role::ModuleAdmin);
        assert_eq!(Role::parse(""), Role::Other(String::new()));
        assert!(!Role::parse("principal").is_admin());
        assert!(!Role::Executive.is_admin());
    }
}
