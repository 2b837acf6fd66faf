use crate::{cache::BlockFact, node::RawTransaction};

/// Builds the fact for one height from its block time and reward transaction.
///
/// A transaction whose first input carries a non-empty `coinbase` is a reward: the
/// first output's value and address become the fact's coins and miner address. Every
/// other case, including a missing transaction, a missing output or a value that is
/// negative or not finite, yields a non-reward fact.
#[must_use]
pub fn classify(
    height: u64,
    hash: impl Into<String>,
    epoch_time: i64,
    tx: Option<&RawTransaction>,
) -> BlockFact {
    let hash = hash.into();

    let Some(tx) = tx else {
        return BlockFact::without_reward(height, hash, epoch_time);
    };

    let is_generation =
        tx.vin.first().and_then(|input| input.coinbase.as_deref()).is_some_and(|cb| !cb.is_empty());

    match (is_generation, tx.vout.first()) {
        (true, Some(output)) if output.value.is_finite() && output.value >= 0.0 => BlockFact {
            height,
            hash,
            epoch_time,
            miner_address: output.script_pub_key.address.clone().unwrap_or_default(),
            coins: output.value,
        },
        _ => BlockFact::without_reward(height, hash, epoch_time),
    }
}
