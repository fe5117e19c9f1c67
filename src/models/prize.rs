use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

/// 奖品配置（库存中的一行）
/// 说明:
/// - rank: 从 1 开始连续编号，即其在奖池中的位置
/// - quantity: 管理员配置的总数量
/// - remaining: 当前可抽数量 (0 <= remaining <= quantity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    /// 等级 (1 = 最高)
    pub rank: u32,
    /// 奖品名称（编辑中允许为空）
    #[serde(default)]
    pub name: String,
    /// 配置总数量
    #[serde(default)]
    pub quantity: u32,
    /// 剩余可抽数量
    #[serde(default)]
    pub remaining: u32,
    /// 中奖后是否需要填写配送信息
    #[serde(default)]
    pub requires_shipping: bool,
}

impl Prize {
    fn empty(rank: u32) -> Self {
        Self {
            rank,
            name: String::new(),
            quantity: 0,
            remaining: 0,
            requires_shipping: false,
        }
    }
}

/// 单行奖品的局部更新
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrizePatch {
    pub name: Option<String>,
    /// 修改数量会把 remaining 重置为新数量
    pub quantity: Option<u32>,
    pub requires_shipping: Option<bool>,
}

/// 结果展示方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// 仅显示等级
    Rank,
    /// 仅显示奖品名称
    Prize,
    #[default]
    Both,
}

impl DisplayMode {
    pub fn label(&self, rank: u32, name: &str) -> String {
        match self {
            DisplayMode::Rank => format!("Rank {rank}"),
            DisplayMode::Prize => name.to_string(),
            DisplayMode::Both => format!("Rank {rank} - {name}"),
        }
    }
}

/// 按等级升序排列的奖池
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PrizePool {
    prizes: Vec<Prize>,
}

impl PrizePool {
    pub fn new(prizes: Vec<Prize>) -> Self {
        Self { prizes }
    }

    pub fn prizes(&self) -> &[Prize] {
        &self.prizes
    }

    pub fn len(&self) -> usize {
        self.prizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prizes.is_empty()
    }

    pub fn get(&self, rank: u32) -> Option<&Prize> {
        self.position(rank).map(|i| &self.prizes[i])
    }

    pub fn total_quantity(&self) -> u64 {
        self.prizes.iter().map(|p| p.quantity as u64).sum()
    }

    /// 奖池是否可抽只由剩余总数决定
    pub fn total_remaining(&self) -> u64 {
        self.prizes.iter().map(|p| p.remaining as u64).sum()
    }

    /// 追加一行数量为 0 的奖品，等级为下一个连续编号
    pub fn add_line(&mut self, max_lines: usize) -> AppResult<&Prize> {
        if self.prizes.len() >= max_lines {
            return Err(AppError::ValidationError(format!(
                "Prize pool cannot exceed {max_lines} lines"
            )));
        }
        let rank = self.prizes.len() as u32 + 1;
        self.prizes.push(Prize::empty(rank));
        Ok(&self.prizes[self.prizes.len() - 1])
    }

    /// 删除一行并重新编号后续等级
    pub fn remove_line(&mut self, rank: u32) -> AppResult<Prize> {
        let index = self
            .position(rank)
            .ok_or_else(|| AppError::NotFound(format!("Prize rank {rank}")))?;
        let removed = self.prizes.remove(index);
        self.renumber();
        Ok(removed)
    }

    pub fn update_line(&mut self, rank: u32, patch: PrizePatch) -> AppResult<&Prize> {
        let index = self
            .position(rank)
            .ok_or_else(|| AppError::NotFound(format!("Prize rank {rank}")))?;
        let prize = &mut self.prizes[index];
        if let Some(name) = patch.name {
            prize.name = name;
        }
        if let Some(quantity) = patch.quantity {
            prize.quantity = quantity;
            prize.remaining = quantity;
        }
        if let Some(requires_shipping) = patch.requires_shipping {
            prize.requires_shipping = requires_shipping;
        }
        Ok(&self.prizes[index])
    }

    /// 扣减一个库存；remaining 为 0 时拒绝
    pub fn decrement(&mut self, rank: u32) -> AppResult<()> {
        let prize = self
            .position(rank)
            .map(|i| &mut self.prizes[i])
            .ok_or_else(|| AppError::NotFound(format!("Prize rank {rank}")))?;
        if prize.remaining == 0 {
            return Err(AppError::InsufficientInventory {
                requested: 1,
                remaining: 0,
            });
        }
        prize.remaining -= 1;
        Ok(())
    }

    /// 校验整份奖池: 等级 1..N 连续, remaining <= quantity, 行数不超过上限
    pub fn validate(&self, max_lines: usize) -> AppResult<()> {
        if self.prizes.len() > max_lines {
            return Err(AppError::ValidationError(format!(
                "Prize pool cannot exceed {max_lines} lines"
            )));
        }
        for (i, prize) in self.prizes.iter().enumerate() {
            let expected = i as u32 + 1;
            if prize.rank != expected {
                return Err(AppError::ValidationError(format!(
                    "Ranks must be contiguous from 1: expected {expected}, got {}",
                    prize.rank
                )));
            }
            if prize.remaining > prize.quantity {
                return Err(AppError::ValidationError(format!(
                    "Rank {} remaining {} exceeds quantity {}",
                    prize.rank, prize.remaining, prize.quantity
                )));
            }
        }
        Ok(())
    }

    /// 修复外部文档中的不一致（排序、重新编号、remaining 截断），返回是否有改动
    pub fn normalize(&mut self) -> bool {
        let before = self.prizes.clone();
        self.prizes.sort_by_key(|p| p.rank);
        self.renumber();
        for prize in &mut self.prizes {
            prize.remaining = prize.remaining.min(prize.quantity);
        }
        before != self.prizes
    }

    fn position(&self, rank: u32) -> Option<usize> {
        self.prizes.iter().position(|p| p.rank == rank)
    }

    fn renumber(&mut self) {
        for (i, prize) in self.prizes.iter_mut().enumerate() {
            prize.rank = i as u32 + 1;
        }
    }
}

/// 存储中的奖品配置文档（整体读写）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrizeDocument {
    #[serde(default)]
    #[schema(value_type = Vec<Prize>)]
    pub prizes: PrizePool,
    #[serde(default)]
    pub display_mode: DisplayMode,
    /// 活动进行中冻结配置
    #[serde(default)]
    pub is_locked: bool,
    /// 活动已截止
    #[serde(default)]
    pub is_closed: bool,
    /// 彩排模式：抽奖不扣减库存
    #[serde(default)]
    pub is_test_mode: bool,
    #[serde(default)]
    pub notice_message: String,
    #[serde(default = "default_theme_color")]
    pub theme_color: String,
}

fn default_theme_color() -> String {
    "gradient1".to_string()
}

impl Default for PrizeDocument {
    fn default() -> Self {
        Self {
            prizes: PrizePool::default(),
            display_mode: DisplayMode::default(),
            is_locked: false,
            is_closed: false,
            is_test_mode: false,
            notice_message: String::new(),
            theme_color: default_theme_color(),
        }
    }
}

/// 管理端可修改的活动设置
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    pub display_mode: Option<DisplayMode>,
    pub is_test_mode: Option<bool>,
    pub notice_message: Option<String>,
    pub theme_color: Option<String>,
}

impl PrizeDocument {
    fn ensure_unlocked(&self) -> AppResult<()> {
        if self.is_locked {
            return Err(AppError::PoolLocked);
        }
        Ok(())
    }

    pub fn add_line(&mut self, max_lines: usize) -> AppResult<Prize> {
        self.ensure_unlocked()?;
        self.prizes.add_line(max_lines).cloned()
    }

    pub fn remove_line(&mut self, rank: u32) -> AppResult<Prize> {
        self.ensure_unlocked()?;
        self.prizes.remove_line(rank)
    }

    pub fn update_line(&mut self, rank: u32, patch: PrizePatch) -> AppResult<Prize> {
        self.ensure_unlocked()?;
        self.prizes.update_line(rank, patch).cloned()
    }

    /// 锁定期间展示方式与运营模式不可修改，其余设置不受限
    pub fn apply_settings(&mut self, patch: SettingsPatch) -> AppResult<()> {
        let touches_frozen = patch.display_mode.is_some_and(|m| m != self.display_mode)
            || patch.is_test_mode.is_some_and(|t| t != self.is_test_mode);
        if touches_frozen {
            self.ensure_unlocked()?;
        }
        if let Some(mode) = patch.display_mode {
            self.display_mode = mode;
        }
        if let Some(test_mode) = patch.is_test_mode {
            self.is_test_mode = test_mode;
        }
        if let Some(message) = patch.notice_message {
            self.notice_message = message;
        }
        if let Some(color) = patch.theme_color {
            self.theme_color = color;
        }
        Ok(())
    }
}
