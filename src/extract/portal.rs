//! Korea tourism portal detail pages (rendered in a browser first).

use super::{Rule, RuleSet};

pub(super) static RULES: RuleSet = RuleSet {
    summary: &[Rule::Region("#contents .titTypeWrap")],
    content: &[Rule::Region(
        "#detailGo .wrap_contView .area_txtView .inr_wrap .inr p",
    )],
};
