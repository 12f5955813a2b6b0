use core::fmt;

/// Classification of a delegated account's on-chain state.
///
/// Each flag is decided from an independent read and recomputed on every inspection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueVector {
    /// Account code is not a delegation designation naming the expected proxy template.
    pub delegate_incorrect: bool,
    /// ERC-1967 slot does not hold the expected implementation.
    pub implementation_incorrect: bool,
    /// Expected owner credential is missing from the owner set or registered at another index.
    pub ownership_disrupted: bool,
}

impl IssueVector {
    pub const HEALTHY: Self = Self::new(false, false, false);

    pub const fn new(
        delegate_incorrect: bool,
        implementation_incorrect: bool,
        ownership_disrupted: bool,
    ) -> Self {
        Self {
            delegate_incorrect,
            implementation_incorrect,
            ownership_disrupted,
        }
    }

    pub const fn is_healthy(&self) -> bool {
        !self.delegate_incorrect && !self.implementation_incorrect && !self.ownership_disrupted
    }

    /// All eight combinations, in table order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0u8..8).map(|bits| Self::new(bits & 0b100 != 0, bits & 0b010 != 0, bits & 0b001 != 0))
    }
}

impl From<(bool, bool, bool)> for IssueVector {
    fn from((delegate, implementation, ownership): (bool, bool, bool)) -> Self {
        Self::new(delegate, implementation, ownership)
    }
}

impl fmt::Display for IssueVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = |bad: bool| if bad { "broken" } else { "ok" };
        write!(
            f,
            "delegate={} implementation={} ownership={}",
            flag(self.delegate_incorrect),
            flag(self.implementation_incorrect),
            flag(self.ownership_disrupted)
        )
    }
}
