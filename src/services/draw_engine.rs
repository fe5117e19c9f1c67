use rand::Rng;

use crate::error::{AppError, AppResult};
use crate::models::{DrawOutcome, PrizePool};

/// 抽样结果: 抽取顺序 + 建议的各等级剩余数量（由调用方决定是否提交）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawProposal {
    pub outcome: DrawOutcome,
    /// 下标 i 对应 rank i+1
    pub remaining: Vec<u32>,
}

/// 无放回抽样
///
/// 每个等级的权重等于其当前 remaining。每抽一次从剩余总数中均匀取一个位置，
/// 命中的等级权重减一后再抽下一次，因此每一步的边际概率都是
/// `remaining(R) / total_remaining`。不修改传入的奖池。
pub struct DrawEngine;

impl DrawEngine {
    pub fn draw(pool: &PrizePool, count: u32) -> AppResult<DrawProposal> {
        Self::draw_with_rng(pool, count, &mut rand::thread_rng())
    }

    pub fn draw_with_rng<R: Rng>(
        pool: &PrizePool,
        count: u32,
        rng: &mut R,
    ) -> AppResult<DrawProposal> {
        let mut weights: Vec<u32> = pool.prizes().iter().map(|p| p.remaining).collect();
        let mut total: u64 = weights.iter().map(|&w| w as u64).sum();

        // 库存不足时整体失败，不产生部分结果
        if count as u64 > total {
            return Err(AppError::InsufficientInventory {
                requested: count,
                remaining: total,
            });
        }

        let mut ranks = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let mut pick = rng.gen_range(0..total);
            let index = weights
                .iter()
                .position(|&w| {
                    let w = w as u64;
                    if pick < w {
                        true
                    } else {
                        pick -= w;
                        false
                    }
                })
                .ok_or_else(|| {
                    AppError::InternalError("Sampling fell outside cumulative weights".into())
                })?;

            weights[index] -= 1;
            total -= 1;
            ranks.push(pool.prizes()[index].rank);
        }

        Ok(DrawProposal {
            outcome: DrawOutcome { ranks },
            remaining: weights,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Prize;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn pool(remaining: &[u32]) -> PrizePool {
        PrizePool::new(
            remaining
                .iter()
                .enumerate()
                .map(|(i, &r)| Prize {
                    rank: i as u32 + 1,
                    name: format!("Prize {}", i + 1),
                    quantity: r,
                    remaining: r,
                    requires_shipping: false,
                })
                .collect(),
        )
    }

    #[test]
    fn test_outcome_respects_stock() {
        let mut rng = StdRng::seed_from_u64(7);
        let p = pool(&[1, 3, 0, 12, 5]);
        for count in 1..=21 {
            let proposal = DrawEngine::draw_with_rng(&p, count, &mut rng).unwrap();
            assert_eq!(proposal.outcome.len(), count as usize);
            for prize in p.prizes() {
                let drawn = proposal.outcome.count_of(prize.rank) as u32;
                assert!(drawn <= prize.remaining);
                assert_eq!(proposal.remaining[prize.rank as usize - 1], prize.remaining - drawn);
            }
        }
    }

    #[test]
    fn test_drawing_everything_empties_pool() {
        let mut rng = StdRng::seed_from_u64(1);
        let p = pool(&[2, 3, 1]);
        let proposal = DrawEngine::draw_with_rng(&p, 6, &mut rng).unwrap();
        assert_eq!(proposal.remaining, vec![0, 0, 0]);
        assert_eq!(proposal.outcome.count_of(1), 2);
        assert_eq!(proposal.outcome.count_of(2), 3);
        assert_eq!(proposal.outcome.count_of(3), 1);
    }

    #[test]
    fn test_zero_weight_rank_never_drawn() {
        let p = pool(&[2, 0]);
        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let proposal = DrawEngine::draw_with_rng(&p, 2, &mut rng).unwrap();
            assert_eq!(proposal.outcome.ranks, vec![1, 1]);
            assert_eq!(proposal.remaining, vec![0, 0]);
        }
    }

    #[test]
    fn test_insufficient_inventory_leaves_pool_untouched() {
        let p = pool(&[1, 1]);
        let before = p.clone();
        let err = DrawEngine::draw(&p, 3).unwrap_err();
        assert!(matches!(
            err,
            AppError::InsufficientInventory {
                requested: 3,
                remaining: 2
            }
        ));
        assert_eq!(p, before);
    }

    #[test]
    fn test_empty_pool_rejects_any_draw() {
        let p = PrizePool::default();
        assert!(DrawEngine::draw(&p, 1).is_err());
    }

    #[test]
    fn test_equal_weights_are_balanced() {
        let mut rng = StdRng::seed_from_u64(42);
        let p = pool(&[1, 1]);
        let trials = 20_000;
        let mut first = 0;
        for _ in 0..trials {
            let proposal = DrawEngine::draw_with_rng(&p, 1, &mut rng).unwrap();
            if proposal.outcome.ranks[0] == 1 {
                first += 1;
            }
        }
        let freq = first as f64 / trials as f64;
        assert!((freq - 0.5).abs() < 0.02, "frequency {freq}");
    }

    #[test]
    fn test_marginal_probability_follows_weights() {
        let mut rng = StdRng::seed_from_u64(99);
        let p = pool(&[1, 3]);
        let trials = 20_000;
        let mut rank_two = 0;
        for _ in 0..trials {
            let proposal = DrawEngine::draw_with_rng(&p, 1, &mut rng).unwrap();
            if proposal.outcome.ranks[0] == 2 {
                rank_two += 1;
            }
        }
        let freq = rank_two as f64 / trials as f64;
        assert!((freq - 0.75).abs() < 0.02, "frequency {freq}");
    }

    #[test]
    fn test_without_replacement_second_pick() {
        // [1, 1] 抽 2 个: 两个等级各出现一次，顺序各占一半
        let mut rng = StdRng::seed_from_u64(5);
        let p = pool(&[1, 1]);
        let trials = 10_000;
        let mut one_first = 0;
        for _ in 0..trials {
            let proposal = DrawEngine::draw_with_rng(&p, 2, &mut rng).unwrap();
            let mut sorted = proposal.outcome.ranks.clone();
            sorted.sort();
            assert_eq!(sorted, vec![1, 2]);
            if proposal.outcome.ranks[0] == 1 {
                one_first += 1;
            }
        }
        let freq = one_first as f64 / trials as f64;
        assert!((freq - 0.5).abs() < 0.03, "frequency {freq}");
    }
}
