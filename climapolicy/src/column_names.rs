//! This module stores the column names used by the source workbooks and by the normalized
//! tables. The Korean names are the authored sheet conventions and must be kept in sync with
//! the workbooks the dashboards are fed with.

// Canonical names of a normalized (long form) table
pub const CATEGORY: &str = "category";
pub const GROUP: &str = "group";
pub const VALUE: &str = "value";

// Emissions sheet
pub const SECTOR: &str = "부문";
pub const PARTY: &str = "정당";
pub const EMISSIONS_VALUE: &str = "값";
pub const TOTAL_EMISSIONS_ROW: &str = "총배출";

// Energy mix sheet
pub const ENERGY_SOURCE: &str = "에너지원";
pub const SCENARIO: &str = "시나리오";
pub const SHARE: &str = "비중";

// Temperature pathway sheet
pub const YEAR: &str = "연도";
pub const PATHWAY: &str = "경로";
pub const PATHWAY_EMISSIONS: &str = "배출량";

// Policy assessment sheet
pub const POLICY_CATEGORY: &str = "분야";
pub const POLICY_LEVEL: &str = "강도";
pub const POLICY_DESCRIPTION: &str = "내용";

// Derived columns appended on export
pub const REDUCTION_PCT: &str = "감축률(%)";
