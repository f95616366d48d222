//! Streaming autoregressive generation driver.
//!
//! The driver owns the token loop only: forward pass in, next id out,
//! incremental detokenization, per-token timing, cooperative yields. The
//! tensor math behind [`GraphModel::forward_next`] is the injected model's
//! concern, as is the tokenizer's vocabulary.

use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use async_stream::try_stream;
use futures_core::stream::Stream;
use log::{debug, info, warn};
use ndarray::Array1;
use rand::Rng;
use tokenizers::Tokenizer;

use crate::model::GraphModel;
use crate::options::{DecodingStrategy, SamplingParams};
use crate::stats::GenerationStats;

/// Whether a streamed token came from the prompt or was generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    Prompt,
    Generated,
}

/// One token yielded by the generation stream.
#[derive(Debug, Clone)]
pub struct StreamedToken {
    pub text: String,
    pub id: u32,
    pub token_type: TokenType,
    /// Wall-clock time spent producing this token; zero for prompt tokens.
    pub time_per_token: Duration,
}

/// Generates a lazy, finite stream of tokens for a prompt.
///
/// The prompt tokens are echoed first, then generated tokens follow until
/// `max_length` total tokens, the model's end-of-text id, or the consumer
/// drops the stream. A cooperative yield follows every generated token.
pub(crate) async fn stream_tokens<'a>(
    model: &'a mut dyn GraphModel,
    tokenizer: &'a Tokenizer,
    prompt: &str,
    strategy: DecodingStrategy,
    max_length: usize,
) -> Result<impl Stream<Item = Result<StreamedToken>> + 'a> {
    let encoding = tokenizer
        .encode(prompt, false)
        .map_err(|e| anyhow!("tokenization failed: {}", e))?;
    let mut tokens: Vec<u32> = encoding.get_ids().to_vec();
    let prompt_tokens = tokens.clone();

    let context_limit = model.context_size();
    let limit = max_length.min(context_limit);
    if limit < max_length {
        warn!(
            "max_length {} exceeds model context {}, clamping",
            max_length, context_limit
        );
    }

    debug!(
        "generating from {} prompt token(s), limit {}",
        prompt_tokens.len(),
        limit
    );

    Ok(try_stream! {
        for &id in &prompt_tokens {
            let text = tokenizer.decode(&[id], false).map_err(|e| anyhow!(e))?;
            yield StreamedToken {
                text,
                id,
                token_type: TokenType::Prompt,
                time_per_token: Duration::ZERO,
            };
        }

        let mut stats = GenerationStats::new();
        let generation_start = Instant::now();

        while tokens.len() < limit {
            let step_start = Instant::now();

            let logits = model.forward_next(&tokens)?;
            let next_token = sample_token(logits, &strategy)?;
            tokens.push(next_token);

            let elapsed = step_start.elapsed();
            stats.record_token();

            let text = tokenizer.decode(&[next_token], false).map_err(|e| anyhow!(e))?;
            debug!("token: {} ({}), time: {:?}", text, next_token, elapsed);

            yield StreamedToken {
                text,
                id: next_token,
                token_type: TokenType::Generated,
                time_per_token: elapsed,
            };

            if model.eos_token_id() == Some(next_token) {
                debug!("end-of-text token generated, stopping");
                break;
            }

            tokio::task::yield_now().await;
        }

        if stats.tokens_generated() > 0 {
            info!(
                "generation complete in {:.2}s, {}",
                generation_start.elapsed().as_secs_f64(),
                stats.summary_line()
            );
        }
    })
}

/// Selects the next token id from the logits.
pub(crate) fn sample_token(logits: Array1<f32>, strategy: &DecodingStrategy) -> Result<u32> {
    match strategy {
        DecodingStrategy::Greedy => argmax(&logits),
        DecodingStrategy::Sample(params) => sample(logits, params),
    }
}

fn argmax(logits: &Array1<f32>) -> Result<u32> {
    logits
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(idx, _)| idx as u32)
        .ok_or_else(|| anyhow!("cannot sample from empty logits"))
}

fn sample(mut logits: Array1<f32>, params: &SamplingParams) -> Result<u32> {
    // Temperature 0 degenerates to argmax rather than dividing by zero.
    if params.temperature < 1e-5 {
        return argmax(&logits);
    }

    if let Some(k) = params.top_k {
        logits = top_k_filtering(logits, k);
    }
    if let Some(p) = params.top_p {
        logits = top_p_filtering(logits, p);
    }

    logits /= params.temperature;
    softmax_1d_inplace(&mut logits);
    sample_from_probs(&logits)
}

fn softmax_1d_inplace(logits: &mut Array1<f32>) {
    let max_val = logits.fold(f32::NEG_INFINITY, |acc, &x| acc.max(x));
    logits.mapv_inplace(|x| (x - max_val).exp());
    let sum = logits.sum();
    if sum > 0.0 {
        *logits /= sum;
    }
}

fn top_k_filtering(mut logits: Array1<f32>, k: usize) -> Array1<f32> {
    if k >= logits.len() {
        return logits;
    }
    let mut indices: Vec<usize> = (0..logits.len()).collect();
    indices.sort_by(|&a, &b| logits[b].partial_cmp(&logits[a]).unwrap_or(std::cmp::Ordering::Equal));
    for &idx in &indices[k..] {
        logits[idx] = f32::NEG_INFINITY;
    }
    logits
}

fn top_p_filtering(mut logits: Array1<f32>, p: f32) -> Array1<f32> {
    let mut indices: Vec<usize> = (0..logits.len()).collect();
    indices.sort_by(|&a, &b| logits[b].partial_cmp(&logits[a]).unwrap_or(std::cmp::Ordering::Equal));

    let mut probs = logits.clone();
    softmax_1d_inplace(&mut probs);

    let mut cumulative = 0.0;
    for (i, &idx) in indices.iter().enumerate() {
        cumulative += probs[idx];
        if cumulative > p {
            for &invalid_idx in &indices[i + 1..] {
                logits[invalid_idx] = f32::NEG_INFINITY;
            }
            break;
        }
    }
    logits
}

fn sample_from_probs(probs: &Array1<f32>) -> Result<u32> {
    let mut rng = rand::thread_rng();
    let uniform: f32 = rng.gen();
    let mut cumulative = 0.0;
    for (idx, &prob) in probs.iter().enumerate() {
        cumulative += prob;
        if cumulative >= uniform {
            return Ok(idx as u32);
        }
    }
    Ok((probs.len() - 1) as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{tiny_tokenizer, StubModel};
    use futures_util::{pin_mut, StreamExt};
    use ndarray::array;
    use vefgpt_weights::SlotSpec;

    #[test]
    fn test_greedy_picks_max() {
        let logits = array![1.0, 5.0, 3.0, 2.0];
        let token = sample_token(logits, &DecodingStrategy::Greedy).unwrap();
        assert_eq!(token, 1);
    }

    #[test]
    fn test_zero_temperature_sampling_is_greedy() {
        let strategy = DecodingStrategy::Sample(SamplingParams {
            temperature: 0.0,
            top_k: None,
            top_p: None,
        });

        for _ in 0..10 {
            let token = sample_token(array![1.0, 2.0, 10.0, 0.5], &strategy).unwrap();
            assert_eq!(token, 2);
        }
    }

    #[test]
    fn test_top_k_one_forces_max() {
        let strategy = DecodingStrategy::Sample(SamplingParams {
            temperature: 0.5,
            top_k: Some(1),
            top_p: None,
        });

        for _ in 0..10 {
            let token = sample_token(array![1.0, 2.0, 10.0, 0.5, 0.1], &strategy).unwrap();
            assert_eq!(token, 2);
        }
    }

    #[test]
    fn test_top_k_larger_than_vocab_is_identity() {
        let filtered = top_k_filtering(array![1.0, 2.0, 3.0], 10);
        assert!(filtered.iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_softmax_sums_to_one() {
        let mut logits = array![1000.0, 1001.0, 1002.0];
        softmax_1d_inplace(&mut logits);
        assert!((logits.sum() - 1.0).abs() < 1e-6);
        assert!(logits.iter().all(|p| p.is_finite()));
    }

    #[tokio::test]
    async fn test_stream_echoes_prompt_then_generates() {
        let mut model = StubModel::new(vec![SlotSpec::new("transformer/wte/embeddings", vec![8, 2])]);
        let tokenizer = tiny_tokenizer(8);

        let stream = stream_tokens(
            &mut model,
            &tokenizer,
            "t0",
            DecodingStrategy::Greedy,
            4,
        )
        .await
        .unwrap();
        pin_mut!(stream);

        let mut seen = Vec::new();
        while let Some(token) = stream.next().await {
            seen.push(token.unwrap());
        }

        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].token_type, TokenType::Prompt);
        assert_eq!(seen[0].id, 0);
        assert!(seen[1..].iter().all(|t| t.token_type == TokenType::Generated));
        // The stub walks the vocabulary one id at a time.
        assert_eq!(
            seen.iter().map(|t| t.id).collect::<Vec<_>>(),
            vec![0, 1, 2, 3]
        );
    }

    #[tokio::test]
    async fn test_stream_stops_at_eos() {
        let mut model = StubModel::new(vec![]).with_eos(Some(2));
        let tokenizer = tiny_tokenizer(8);

        let stream = stream_tokens(
            &mut model,
            &tokenizer,
            "t0",
            DecodingStrategy::Greedy,
            100,
        )
        .await
        .unwrap();
        pin_mut!(stream);

        let mut ids = Vec::new();
        while let Some(token) = stream.next().await {
            ids.push(token.unwrap().id);
        }

        // Generation halts once the end-of-text id is produced.
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_max_length_bounds_total_tokens() {
        let mut model = StubModel::new(vec![]);
        let tokenizer = tiny_tokenizer(8);

        let stream = stream_tokens(
            &mut model,
            &tokenizer,
            "t0 t1 t2",
            DecodingStrategy::Greedy,
            2,
        )
        .await
        .unwrap();
        pin_mut!(stream);

        let mut count = 0;
        while let Some(token) = stream.next().await {
            token.unwrap();
            count += 1;
        }

        // Prompt longer than max_length: nothing is generated.
        assert_eq!(count, 3);
    }
}
