use std::collections::BTreeMap;
use std::time::Duration;

use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{
    DisplayMode, DrawnPrize, RevealItemView, RevealState, RevealSummaryEntry, RevealView,
};

/// 揭晓策略
#[derive(Debug, Clone)]
pub struct RevealPolicy {
    /// 需要点击揭晓的等级
    pub high_ranks: Vec<u32>,
    /// 庆祝效果与揭晓文案之间的间隔
    pub high_rank_delay: Duration,
}

impl RevealPolicy {
    pub fn is_high(&self, rank: u32) -> bool {
        self.high_ranks.contains(&rank)
    }
}

impl Default for RevealPolicy {
    fn default() -> Self {
        Self {
            high_ranks: vec![1, 2],
            high_rank_delay: Duration::from_millis(500),
        }
    }
}

/// 状态迁移产生的副作用描述，由宿主执行
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealEffect {
    Disclosed { index: usize },
    /// 庆祝效果（如彩带）
    Celebrate { index: usize, rank: u32 },
    /// 延迟结束后调用 `complete_disclosure(index)`
    ScheduleDisclosure { index: usize, delay: Duration },
    SummaryReady { needs_shipping: bool },
    ShippingRequested { prizes: Vec<RevealSummaryEntry> },
    /// 会话结束，宿主应重置抽奖数量并清空结果
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Hidden,
    Pending,
    Revealed,
}

/// 揭晓状态机: Idle -> Revealing -> Summary -> (ShippingCollection) -> Done
#[derive(Debug, Clone)]
pub struct RevealSequencer {
    policy: RevealPolicy,
    display_mode: DisplayMode,
    state: RevealState,
    items: Vec<DrawnPrize>,
    slots: Vec<Slot>,
    summary: Option<Vec<RevealSummaryEntry>>,
}

impl RevealSequencer {
    pub fn new(policy: RevealPolicy, display_mode: DisplayMode) -> Self {
        Self {
            policy,
            display_mode,
            state: RevealState::Idle,
            items: Vec::new(),
            slots: Vec::new(),
            summary: None,
        }
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn items(&self) -> &[DrawnPrize] {
        &self.items
    }

    pub fn is_revealed(&self, index: usize) -> bool {
        self.slots.get(index) == Some(&Slot::Revealed)
    }

    pub fn revealed_count(&self) -> usize {
        self.slots.iter().filter(|s| **s == Slot::Revealed).count()
    }

    /// 进入 Revealing: 普通等级按顺序立即揭晓，高等级等待点击
    pub fn start(&mut self, items: Vec<DrawnPrize>) -> AppResult<Vec<RevealEffect>> {
        if !matches!(self.state, RevealState::Idle | RevealState::Done) {
            return Err(self.invalid("start"));
        }

        self.slots = items
            .iter()
            .map(|item| {
                if self.policy.is_high(item.rank) {
                    Slot::Hidden
                } else {
                    Slot::Revealed
                }
            })
            .collect();
        self.items = items;
        self.summary = None;

        if self.items.is_empty() {
            return Ok(vec![self.enter_summary()]);
        }

        self.state = RevealState::Revealing;
        Ok(self
            .slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| **slot == Slot::Revealed)
            .map(|(index, _)| RevealEffect::Disclosed { index })
            .collect())
    }

    /// 点击揭晓；已揭晓或等待中的位置重复调用不产生任何效果
    pub fn disclose(&mut self, index: usize) -> AppResult<Vec<RevealEffect>> {
        if self.state != RevealState::Revealing {
            return Err(self.invalid("disclose"));
        }
        let slot = self
            .slots
            .get_mut(index)
            .ok_or_else(|| AppError::ValidationError(format!("No reveal item at index {index}")))?;

        match slot {
            Slot::Hidden => {
                *slot = Slot::Pending;
                let rank = self.items[index].rank;
                Ok(vec![
                    RevealEffect::Celebrate { index, rank },
                    RevealEffect::ScheduleDisclosure {
                        index,
                        delay: self.policy.high_rank_delay,
                    },
                ])
            }
            Slot::Pending | Slot::Revealed => Ok(Vec::new()),
        }
    }

    /// 延迟结束；会话已结束或被重置时忽略
    pub fn complete_disclosure(&mut self, index: usize) -> Vec<RevealEffect> {
        match self.slots.get_mut(index) {
            Some(slot) if *slot == Slot::Pending => {
                *slot = Slot::Revealed;
                vec![RevealEffect::Disclosed { index }]
            }
            _ => Vec::new(),
        }
    }

    /// 查看全部结果；未揭晓的高等级也允许直接进入汇总
    pub fn show_summary(&mut self) -> AppResult<Vec<RevealEffect>> {
        if self.state != RevealState::Revealing {
            return Err(self.invalid("show summary"));
        }
        Ok(vec![self.enter_summary()])
    }

    fn enter_summary(&mut self) -> RevealEffect {
        let summary = summarize(&self.items, self.display_mode);
        let needs_shipping = summary.iter().any(|e| e.requires_shipping);
        self.summary = Some(summary);
        self.state = RevealState::Summary;
        RevealEffect::SummaryReady { needs_shipping }
    }

    pub fn summary(&self) -> Option<&[RevealSummaryEntry]> {
        self.summary.as_deref()
    }

    pub fn needs_shipping(&self) -> bool {
        self.summary
            .as_ref()
            .is_some_and(|s| s.iter().any(|e| e.requires_shipping))
    }

    /// 需要配送的汇总条目
    pub fn shipping_entries(&self) -> Vec<RevealSummaryEntry> {
        self.summary
            .iter()
            .flatten()
            .filter(|e| e.requires_shipping)
            .cloned()
            .collect()
    }

    pub fn open_shipping(&mut self) -> AppResult<Vec<RevealEffect>> {
        if self.state != RevealState::Summary {
            return Err(self.invalid("open shipping"));
        }
        if !self.needs_shipping() {
            return Err(AppError::InvalidTransition(
                "No prize in this draw requires shipping".to_string(),
            ));
        }
        self.state = RevealState::ShippingCollection;
        Ok(vec![RevealEffect::ShippingRequested {
            prizes: self.shipping_entries(),
        }])
    }

    /// 关闭配送表单，回到汇总
    pub fn close_shipping(&mut self) -> AppResult<Vec<RevealEffect>> {
        if self.state != RevealState::ShippingCollection {
            return Err(self.invalid("close shipping"));
        }
        self.state = RevealState::Summary;
        Ok(Vec::new())
    }

    /// 终态: 清空结果与等待中的揭晓
    pub fn finish(&mut self) -> AppResult<Vec<RevealEffect>> {
        if !matches!(
            self.state,
            RevealState::Summary | RevealState::ShippingCollection
        ) {
            return Err(self.invalid("finish"));
        }
        self.items.clear();
        self.slots.clear();
        self.summary = None;
        self.state = RevealState::Done;
        Ok(vec![RevealEffect::Completed])
    }

    pub fn view(&self, session_id: Uuid, celebrations: u32) -> RevealView {
        let items = self
            .items
            .iter()
            .zip(&self.slots)
            .enumerate()
            .map(|(index, (item, slot))| {
                let revealed = *slot == Slot::Revealed;
                RevealItemView {
                    index,
                    high: self.policy.is_high(item.rank),
                    revealed,
                    pending: *slot == Slot::Pending,
                    rank: revealed.then_some(item.rank),
                    label: revealed.then(|| self.display_mode.label(item.rank, &item.name)),
                }
            })
            .collect();

        RevealView {
            session_id,
            state: self.state,
            items,
            summary: self.summary.clone(),
            needs_shipping: self.needs_shipping(),
            celebrations,
        }
    }

    fn invalid(&self, action: &str) -> AppError {
        AppError::InvalidTransition(format!("Cannot {action} in state {:?}", self.state))
    }
}

/// 按 (rank, name) 分组计数，按等级升序
pub fn summarize(items: &[DrawnPrize], display_mode: DisplayMode) -> Vec<RevealSummaryEntry> {
    let mut groups: BTreeMap<(u32, &str), (u32, bool)> = BTreeMap::new();
    for item in items {
        let entry = groups
            .entry((item.rank, item.name.as_str()))
            .or_insert((0, false));
        entry.0 += 1;
        entry.1 |= item.requires_shipping;
    }

    groups
        .into_iter()
        .map(|((rank, name), (count, requires_shipping))| RevealSummaryEntry {
            rank,
            name: name.to_string(),
            count,
            requires_shipping,
            label: display_mode.label(rank, name),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(rank: u32, shipping: bool) -> DrawnPrize {
        DrawnPrize {
            rank,
            name: format!("Prize {rank}"),
            requires_shipping: shipping,
        }
    }

    fn sequencer() -> RevealSequencer {
        RevealSequencer::new(RevealPolicy::default(), DisplayMode::Both)
    }

    #[test]
    fn test_low_ranks_auto_disclose_in_order() {
        let mut seq = sequencer();
        let effects = seq
            .start(vec![item(3, false), item(1, true), item(4, false)])
            .unwrap();
        assert_eq!(seq.state(), RevealState::Revealing);
        assert_eq!(
            effects,
            vec![
                RevealEffect::Disclosed { index: 0 },
                RevealEffect::Disclosed { index: 2 }
            ]
        );
        assert!(!seq.is_revealed(1));

        let view = seq.view(Uuid::nil(), 0);
        assert!(view.items[1].high);
        assert_eq!(view.items[1].rank, None);
        assert_eq!(view.items[0].label.as_deref(), Some("Rank 3 - Prize 3"));
    }

    #[test]
    fn test_high_rank_celebrates_then_waits_for_delay() {
        let mut seq = sequencer();
        seq.start(vec![item(2, false)]).unwrap();

        let effects = seq.disclose(0).unwrap();
        assert_eq!(
            effects,
            vec![
                RevealEffect::Celebrate { index: 0, rank: 2 },
                RevealEffect::ScheduleDisclosure {
                    index: 0,
                    delay: Duration::from_millis(500)
                }
            ]
        );
        assert!(!seq.is_revealed(0));
        assert!(seq.view(Uuid::nil(), 1).items[0].pending);

        assert_eq!(
            seq.complete_disclosure(0),
            vec![RevealEffect::Disclosed { index: 0 }]
        );
        assert!(seq.is_revealed(0));
    }

    #[test]
    fn test_disclose_is_idempotent() {
        let mut seq = sequencer();
        seq.start(vec![item(1, false), item(5, false)]).unwrap();
        seq.disclose(0).unwrap();
        seq.complete_disclosure(0);
        let revealed = seq.revealed_count();

        assert!(seq.disclose(0).unwrap().is_empty());
        assert!(seq.disclose(1).unwrap().is_empty());
        assert!(seq.complete_disclosure(0).is_empty());
        assert_eq!(seq.revealed_count(), revealed);
    }

    #[test]
    fn test_disclose_out_of_range() {
        let mut seq = sequencer();
        seq.start(vec![item(1, false)]).unwrap();
        assert!(matches!(
            seq.disclose(3),
            Err(AppError::ValidationError(_))
        ));
    }

    #[test]
    fn test_summary_only_on_explicit_request() {
        let mut seq = sequencer();
        seq.start(vec![item(3, false)]).unwrap();
        assert_eq!(seq.state(), RevealState::Revealing);
        assert!(seq.summary().is_none());

        let effects = seq.show_summary().unwrap();
        assert_eq!(
            effects,
            vec![RevealEffect::SummaryReady {
                needs_shipping: false
            }]
        );
        assert_eq!(seq.state(), RevealState::Summary);
    }

    #[test]
    fn test_summary_allowed_with_undisclosed_high_ranks() {
        let mut seq = sequencer();
        seq.start(vec![item(1, true), item(2, false)]).unwrap();
        seq.show_summary().unwrap();
        let summary = seq.summary().unwrap();
        assert_eq!(summary.len(), 2);
        assert!(seq.needs_shipping());
    }

    #[test]
    fn test_summary_groups_and_sorts() {
        let items = vec![
            item(3, false),
            item(1, true),
            item(3, false),
            item(2, false),
            item(3, false),
        ];
        let summary = summarize(&items, DisplayMode::Rank);
        let counts: Vec<(u32, u32)> = summary.iter().map(|e| (e.rank, e.count)).collect();
        assert_eq!(counts, vec![(1, 1), (2, 1), (3, 3)]);
        assert_eq!(summary[2].label, "Rank 3");
        assert!(summary[0].requires_shipping);
    }

    #[test]
    fn test_empty_outcome_goes_straight_to_summary() {
        let mut seq = sequencer();
        let effects = seq.start(Vec::new()).unwrap();
        assert_eq!(
            effects,
            vec![RevealEffect::SummaryReady {
                needs_shipping: false
            }]
        );
        assert_eq!(seq.state(), RevealState::Summary);
        assert_eq!(seq.summary(), Some(&[][..]));
    }

    #[test]
    fn test_shipping_only_when_required() {
        let mut seq = sequencer();
        seq.start(vec![item(4, false)]).unwrap();
        seq.show_summary().unwrap();
        assert!(matches!(
            seq.open_shipping(),
            Err(AppError::InvalidTransition(_))
        ));

        let mut seq = sequencer();
        seq.start(vec![item(1, true), item(4, false), item(1, true)])
            .unwrap();
        seq.show_summary().unwrap();
        let effects = seq.open_shipping().unwrap();
        match &effects[..] {
            [RevealEffect::ShippingRequested { prizes }] => {
                assert_eq!(prizes.len(), 1);
                assert_eq!(prizes[0].count, 2);
            }
            other => panic!("unexpected effects {other:?}"),
        }
        assert_eq!(seq.state(), RevealState::ShippingCollection);

        seq.close_shipping().unwrap();
        assert_eq!(seq.state(), RevealState::Summary);
    }

    #[test]
    fn test_finish_clears_and_completes() {
        let mut seq = sequencer();
        seq.start(vec![item(1, true)]).unwrap();
        seq.disclose(0).unwrap();
        seq.show_summary().unwrap();
        seq.open_shipping().unwrap();

        assert_eq!(seq.finish().unwrap(), vec![RevealEffect::Completed]);
        assert_eq!(seq.state(), RevealState::Done);
        assert!(seq.items().is_empty());
        // 延迟在结束后才到达
        assert!(seq.complete_disclosure(0).is_empty());
        assert!(seq.finish().is_err());
    }

    #[test]
    fn test_invalid_transitions() {
        let mut seq = sequencer();
        assert!(seq.disclose(0).is_err());
        assert!(seq.show_summary().is_err());
        assert!(seq.finish().is_err());
        seq.start(vec![item(5, false)]).unwrap();
        assert!(seq.start(vec![item(5, false)]).is_err());
        assert!(seq.close_shipping().is_err());
    }
}
