//! Normalization of the SRD API's "choose your starting gear" records.
//!
//! The API expresses starting-equipment options in three shapes (a counted
//! item reference, a pick-from-category choice, and a recursive combination
//! of the two). Everything here is a pure function from those records to one
//! internal representation; unknown shapes yield nothing and are dropped.

use srd::types::{ClassDetail, EquipmentOptionGroup, RawOption};

use crate::character::label_from_index;
use crate::custom_class::CustomClass;

/// One selectable equipment option, normalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EquipmentOption {
    /// Concrete items; the index is repeated to encode quantity.
    Items { label: String, item_ids: Vec<String> },
    /// Pick `choose` items out of an equipment category.
    Category {
        label: String,
        category_index: String,
        choose: u32,
    },
    /// Fixed items plus a category pick.
    ItemsAndCategory {
        label: String,
        item_ids: Vec<String>,
        category_index: String,
        choose: u32,
    },
}

impl EquipmentOption {
    pub fn label(&self) -> &str {
        match self {
            EquipmentOption::Items { label, .. }
            | EquipmentOption::Category { label, .. }
            | EquipmentOption::ItemsAndCategory { label, .. } => label,
        }
    }

    /// The category part, when the option has one.
    pub fn category(&self) -> Option<(&str, u32)> {
        match self {
            EquipmentOption::Items { .. } => None,
            EquipmentOption::Category {
                category_index,
                choose,
                ..
            }
            | EquipmentOption::ItemsAndCategory {
                category_index,
                choose,
                ..
            } => Some((category_index, *choose)),
        }
    }

    /// The fixed items of the option, empty for pure category picks.
    pub fn item_ids(&self) -> &[String] {
        match self {
            EquipmentOption::Items { item_ids, .. }
            | EquipmentOption::ItemsAndCategory { item_ids, .. } => item_ids,
            EquipmentOption::Category { .. } => &[],
        }
    }
}

/// A "choose one of these options" group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentChoiceGroup {
    pub desc: String,
    pub choose: u32,
    pub options: Vec<EquipmentOption>,
}

/// Normalize one raw API option. Returns `None` for shapes this app does
/// not understand; callers drop those silently.
pub fn parse_equipment_option(raw: &RawOption) -> Option<EquipmentOption> {
    match raw.option_type.as_str() {
        "counted_reference" => {
            let of = raw.of.as_ref()?;
            let count = raw.count.unwrap_or(1).max(1);
            let label = if count > 1 {
                format!("{} ({count})", of.name)
            } else {
                of.name.clone()
            };
            Some(EquipmentOption::Items {
                label,
                item_ids: vec![of.index.clone(); count as usize],
            })
        }
        "multiple" => {
            let mut item_ids = Vec::new();
            let mut labels = Vec::new();
            let mut category: Option<(String, u32)> = None;
            for sub in &raw.items {
                match parse_equipment_option(sub) {
                    Some(EquipmentOption::Items {
                        label,
                        item_ids: ids,
                    }) => {
                        item_ids.extend(ids);
                        labels.push(label);
                    }
                    Some(EquipmentOption::Category {
                        label,
                        category_index,
                        choose,
                    }) => {
                        category = Some((category_index, choose));
                        labels.push(label);
                    }
                    // Nested combinations do not occur upstream.
                    Some(EquipmentOption::ItemsAndCategory { .. }) | None => {}
                }
            }
            match (category, item_ids.is_empty()) {
                (Some((category_index, choose)), false) => {
                    Some(EquipmentOption::ItemsAndCategory {
                        label: labels.join(" + "),
                        item_ids,
                        category_index,
                        choose,
                    })
                }
                (Some((category_index, choose)), true) => Some(EquipmentOption::Category {
                    label: labels.join(", "),
                    category_index,
                    choose,
                }),
                (None, false) => Some(EquipmentOption::Items {
                    label: labels.join(", "),
                    item_ids,
                }),
                (None, true) => None,
            }
        }
        "choice" => {
            let choice = raw.choice.as_ref()?;
            let category = choice.from.as_ref()?.equipment_category.as_ref()?;
            let label = if category.name.is_empty() {
                label_from_index(&category.index)
            } else {
                category.name.clone()
            };
            Some(EquipmentOption::Category {
                label,
                category_index: category.index.clone(),
                choose: choice.choose.unwrap_or(1),
            })
        }
        _ => None,
    }
}

fn parse_group(group: &EquipmentOptionGroup) -> Option<EquipmentChoiceGroup> {
    let options: Vec<EquipmentOption> = group
        .from
        .options
        .iter()
        .filter_map(parse_equipment_option)
        .collect();
    if options.is_empty() {
        return None;
    }
    Some(EquipmentChoiceGroup {
        desc: group.desc.clone(),
        choose: group.choose,
        options,
    })
}

/// All equipment choice groups of a class; groups without any recognizable
/// option disappear.
pub fn equipment_choice_groups(class: &ClassDetail) -> Vec<EquipmentChoiceGroup> {
    class
        .starting_equipment_options
        .iter()
        .filter_map(parse_group)
        .collect()
}

/// Fixed starting equipment, quantity-expanded into repeated indices.
pub fn fixed_starting_equipment(class: &ClassDetail) -> Vec<String> {
    let mut out = Vec::new();
    for entry in &class.starting_equipment {
        let Some(index) = entry.item_index() else {
            continue;
        };
        let quantity = entry.quantity.unwrap_or(1).max(1);
        for _ in 0..quantity {
            out.push(index.to_string());
        }
    }
    out
}

/// One selectable skill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillOption {
    pub index: String,
    pub name: String,
}

/// A "choose N skills" group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillChoiceGroup {
    pub choose: u32,
    pub options: Vec<SkillOption>,
}

impl SkillChoiceGroup {
    pub fn contains(&self, index: &str) -> bool {
        self.options.iter().any(|o| o.index == index)
    }

    /// Indices in `selected` that belong to this group.
    pub fn selected_in<'a>(&self, selected: &'a [String]) -> Vec<&'a String> {
        selected.iter().filter(|s| self.contains(s)).collect()
    }
}

fn skill_display_name(index: &str, raw_name: &str) -> String {
    let trimmed = raw_name.strip_prefix("Skill: ").unwrap_or(raw_name).trim();
    if trimmed.is_empty() {
        label_from_index(index)
    } else {
        trimmed.to_string()
    }
}

/// Skill choice groups of an API class: proficiency choices whose options
/// reference `skill-*` proficiencies. Groups with no skill options vanish.
pub fn skill_choice_groups(class: &ClassDetail) -> Vec<SkillChoiceGroup> {
    class
        .proficiency_choices
        .iter()
        .filter_map(|pc| {
            let options: Vec<SkillOption> = pc
                .from
                .options
                .iter()
                .filter_map(|o| o.item.as_ref())
                .filter(|item| item.index.starts_with("skill-"))
                .map(|item| SkillOption {
                    index: item.index.clone(),
                    name: skill_display_name(&item.index, &item.name),
                })
                .collect();
            if options.is_empty() {
                None
            } else {
                Some(SkillChoiceGroup {
                    choose: pc.choose,
                    options,
                })
            }
        })
        .collect()
}

/// Skill choice groups of a custom class.
pub fn custom_skill_choice_groups(class: &CustomClass) -> Vec<SkillChoiceGroup> {
    class
        .proficiency_choices
        .iter()
        .filter(|pc| !pc.options.is_empty())
        .map(|pc| SkillChoiceGroup {
            choose: pc.choose,
            options: pc
                .options
                .iter()
                .map(|index| SkillOption {
                    index: index.clone(),
                    name: label_from_index(index),
                })
                .collect(),
        })
        .collect()
}

/// Skill proficiencies every member of the class gets.
pub fn fixed_skill_proficiencies(class: &ClassDetail) -> Vec<String> {
    class
        .proficiencies
        .iter()
        .filter(|p| p.index.starts_with("skill-"))
        .map(|p| p.index.clone())
        .collect()
}

/// Toggle a skill within one choice group, enforcing the group's
/// choose-count. Returns the rebuilt skill list (fixed proficiencies first,
/// then each group's picks), or `None` when the toggle would exceed the
/// limit and nothing changed.
pub fn toggle_skill_choice(
    current: &[String],
    fixed: &[String],
    groups: &[SkillChoiceGroup],
    group_index: usize,
    skill_index: &str,
) -> Option<Vec<String>> {
    let group = groups.get(group_index)?;

    let mut in_group: Vec<String> = group
        .selected_in(current)
        .into_iter()
        .cloned()
        .collect();

    if let Some(pos) = in_group.iter().position(|s| s == skill_index) {
        in_group.remove(pos);
    } else {
        if in_group.len() as u32 >= group.choose {
            return None;
        }
        in_group.push(skill_index.to_string());
    }

    let mut next: Vec<String> = fixed.to_vec();
    for (i, other) in groups.iter().enumerate() {
        if i == group_index {
            next.extend(in_group.iter().cloned());
        } else {
            next.extend(other.selected_in(current).into_iter().cloned());
        }
    }
    Some(next)
}

/// A bounded pick of items out of an equipment category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryPick {
    choose: u32,
    picked: Vec<String>,
}

impl CategoryPick {
    pub fn new(choose: u32) -> Self {
        Self {
            choose,
            picked: Vec::new(),
        }
    }

    pub fn choose(&self) -> u32 {
        self.choose
    }

    pub fn picked(&self) -> &[String] {
        &self.picked
    }

    pub fn is_full(&self) -> bool {
        self.picked.len() as u32 >= self.choose
    }

    pub fn contains(&self, index: &str) -> bool {
        self.picked.iter().any(|p| p == index)
    }

    /// Check or uncheck an item. Checking past the limit is a no-op and
    /// returns `false`; unchecking always succeeds.
    pub fn toggle(&mut self, index: &str) -> bool {
        if let Some(pos) = self.picked.iter().position(|p| p == index) {
            self.picked.remove(pos);
            return true;
        }
        if self.is_full() {
            return false;
        }
        self.picked.push(index.to_string());
        true
    }

    /// Replace the pick with a single item (single-choose dropdowns).
    pub fn set_single(&mut self, index: Option<&str>) {
        self.picked.clear();
        if let Some(index) = index {
            self.picked.push(index.to_string());
        }
    }
}

/// Resolve the player's group selections into a final equipment list:
/// fixed class equipment first, then each group's chosen option (its fixed
/// items plus any category picks). `selections` and `picks` run parallel to
/// `groups`.
pub fn apply_equipment_choices(
    fixed: &[String],
    groups: &[EquipmentChoiceGroup],
    selections: &[Option<usize>],
    picks: &[CategoryPick],
) -> Vec<String> {
    let mut out: Vec<String> = fixed.to_vec();
    for (i, group) in groups.iter().enumerate() {
        let Some(Some(option_index)) = selections.get(i) else {
            continue;
        };
        let Some(option) = group.options.get(*option_index) else {
            continue;
        };
        out.extend(option.item_ids().iter().cloned());
        if option.category().is_some() {
            if let Some(pick) = picks.get(i) {
                out.extend(pick.picked().iter().cloned());
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use srd::types::EquipmentOptionGroup;

    fn raw(value: serde_json::Value) -> RawOption {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_counted_reference_expands_quantity() {
        let option = parse_equipment_option(&raw(json!({
            "option_type": "counted_reference",
            "count": 2,
            "of": {"index": "handaxe", "name": "Handaxe", "url": ""}
        })))
        .unwrap();

        assert_eq!(
            option,
            EquipmentOption::Items {
                label: "Handaxe (2)".to_string(),
                item_ids: vec!["handaxe".to_string(), "handaxe".to_string()],
            }
        );
    }

    #[test]
    fn test_category_choice() {
        let option = parse_equipment_option(&raw(json!({
            "option_type": "choice",
            "choice": {
                "choose": 1,
                "from": {
                    "option_set_type": "equipment_category",
                    "equipment_category": {"index": "martial-weapons", "name": "Martial Weapons", "url": ""}
                }
            }
        })))
        .unwrap();

        assert_eq!(option.category(), Some(("martial-weapons", 1)));
        assert_eq!(option.label(), "Martial Weapons");
    }

    #[test]
    fn test_multiple_combines_items_and_category() {
        let option = parse_equipment_option(&raw(json!({
            "option_type": "multiple",
            "items": [
                {
                    "option_type": "counted_reference",
                    "count": 1,
                    "of": {"index": "shield", "name": "Shield", "url": ""}
                },
                {
                    "option_type": "choice",
                    "choice": {
                        "choose": 1,
                        "from": {
                            "equipment_category": {"index": "simple-weapons", "name": "Simple Weapons", "url": ""}
                        }
                    }
                }
            ]
        })))
        .unwrap();

        match option {
            EquipmentOption::ItemsAndCategory {
                label,
                item_ids,
                category_index,
                choose,
            } => {
                assert_eq!(label, "Shield + Simple Weapons");
                assert_eq!(item_ids, vec!["shield".to_string()]);
                assert_eq!(category_index, "simple-weapons");
                assert_eq!(choose, 1);
            }
            other => panic!("unexpected option: {other:?}"),
        }
    }

    #[test]
    fn test_unknown_shapes_are_dropped() {
        assert_eq!(
            parse_equipment_option(&raw(json!({"option_type": "breath"}))),
            None
        );
        assert_eq!(parse_equipment_option(&raw(json!({}))), None);

        let group: EquipmentOptionGroup = serde_json::from_value(json!({
            "desc": "(a) something weird",
            "choose": 1,
            "from": {"options": [{"option_type": "breath"}]}
        }))
        .unwrap();
        assert!(parse_group(&group).is_none());
    }

    #[test]
    fn test_fixed_starting_equipment_expands_quantities() {
        let class: ClassDetail = serde_json::from_value(json!({
            "index": "fighter",
            "hit_die": 10,
            "starting_equipment": [
                {"equipment": {"index": "rations", "name": "Rations", "url": ""}, "quantity": 3},
                {"equipment": {"index": "bedroll", "name": "Bedroll", "url": ""}, "quantity": 1}
            ]
        }))
        .unwrap();

        assert_eq!(
            fixed_starting_equipment(&class),
            vec!["rations", "rations", "rations", "bedroll"]
        );
    }

    #[test]
    fn test_skill_choice_groups_filter_non_skills() {
        let class: ClassDetail = serde_json::from_value(json!({
            "index": "fighter",
            "hit_die": 10,
            "proficiency_choices": [{
                "desc": "Choose two skills",
                "choose": 2,
                "type": "proficiencies",
                "from": {"options": [
                    {"option_type": "reference", "item": {"index": "skill-athletics", "name": "Skill: Athletics", "url": ""}},
                    {"option_type": "reference", "item": {"index": "skill-perception", "name": "", "url": ""}},
                    {"option_type": "reference", "item": {"index": "shortswords", "name": "Shortswords", "url": ""}}
                ]}
            }]
        }))
        .unwrap();

        let groups = skill_choice_groups(&class);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].choose, 2);
        assert_eq!(groups[0].options.len(), 2);
        assert_eq!(groups[0].options[0].name, "Athletics");
        // Missing display name falls back to the index.
        assert_eq!(groups[0].options[1].name, "Perception");
    }

    fn two_skill_group() -> Vec<SkillChoiceGroup> {
        vec![SkillChoiceGroup {
            choose: 2,
            options: vec![
                SkillOption {
                    index: "skill-athletics".to_string(),
                    name: "Athletics".to_string(),
                },
                SkillOption {
                    index: "skill-perception".to_string(),
                    name: "Perception".to_string(),
                },
                SkillOption {
                    index: "skill-survival".to_string(),
                    name: "Survival".to_string(),
                },
            ],
        }]
    }

    #[test]
    fn test_toggle_skill_respects_choose_count() {
        let groups = two_skill_group();
        let fixed: Vec<String> = vec![];

        let one = toggle_skill_choice(&[], &fixed, &groups, 0, "skill-athletics").unwrap();
        let two = toggle_skill_choice(&one, &fixed, &groups, 0, "skill-perception").unwrap();
        assert_eq!(two.len(), 2);

        // Third pick exceeds the limit: no change.
        assert!(toggle_skill_choice(&two, &fixed, &groups, 0, "skill-survival").is_none());

        // Unchecking always works.
        let one_again = toggle_skill_choice(&two, &fixed, &groups, 0, "skill-athletics").unwrap();
        assert_eq!(one_again, vec!["skill-perception".to_string()]);
    }

    #[test]
    fn test_toggle_skill_keeps_fixed_and_other_groups() {
        let mut groups = two_skill_group();
        groups.push(SkillChoiceGroup {
            choose: 1,
            options: vec![SkillOption {
                index: "skill-arcana".to_string(),
                name: "Arcana".to_string(),
            }],
        });
        let fixed = vec!["skill-intimidation".to_string()];
        let current = vec![
            "skill-intimidation".to_string(),
            "skill-arcana".to_string(),
        ];

        let next = toggle_skill_choice(&current, &fixed, &groups, 0, "skill-athletics").unwrap();
        assert!(next.contains(&"skill-intimidation".to_string()));
        assert!(next.contains(&"skill-arcana".to_string()));
        assert!(next.contains(&"skill-athletics".to_string()));
    }

    #[test]
    fn test_category_pick_limit() {
        let mut pick = CategoryPick::new(2);
        assert!(pick.toggle("longsword"));
        assert!(pick.toggle("shortbow"));
        assert!(pick.is_full());

        // Checking beyond the limit is a no-op.
        assert!(!pick.toggle("dagger"));
        assert_eq!(pick.picked(), ["longsword", "shortbow"]);

        // Unchecking always succeeds and frees a slot.
        assert!(pick.toggle("longsword"));
        assert_eq!(pick.picked(), ["shortbow"]);
        assert!(pick.toggle("dagger"));
    }

    #[test]
    fn test_apply_equipment_choices() {
        let groups = vec![
            EquipmentChoiceGroup {
                desc: "(a) a shield or (b) a simple weapon".to_string(),
                choose: 1,
                options: vec![
                    EquipmentOption::Items {
                        label: "Shield".to_string(),
                        item_ids: vec!["shield".to_string()],
                    },
                    EquipmentOption::Category {
                        label: "Simple Weapons".to_string(),
                        category_index: "simple-weapons".to_string(),
                        choose: 1,
                    },
                ],
            },
            EquipmentChoiceGroup {
                desc: "two martial weapons".to_string(),
                choose: 1,
                options: vec![EquipmentOption::Category {
                    label: "Martial Weapons".to_string(),
                    category_index: "martial-weapons".to_string(),
                    choose: 2,
                }],
            },
        ];

        let mut martial = CategoryPick::new(2);
        martial.toggle("longsword");
        martial.toggle("warhammer");

        let equipment = apply_equipment_choices(
            &["rations".to_string()],
            &groups,
            &[Some(0), Some(0)],
            &[CategoryPick::new(1), martial],
        );

        assert_eq!(equipment, vec!["rations", "shield", "longsword", "warhammer"]);
    }
}
