use rayon::prelude::*;

use crate::foundation::error::{FlipError, FlipResult};

/// Run `f` over each `width`-long row of `data`, in parallel when a pool is given.
///
/// Rows are independent; results come back in row order either way, so parallel and sequential
/// runs produce identical output.
pub(crate) fn map_rows<T, S, F>(
    data: &mut [T],
    width: usize,
    pool: Option<&rayon::ThreadPool>,
    f: F,
) -> FlipResult<Vec<S>>
where
    T: Send,
    S: Send,
    F: Fn(usize, &mut [T]) -> FlipResult<S> + Sync,
{
    if width == 0 {
        return Ok(Vec::new());
    }
    match pool {
        Some(pool) => pool.install(|| {
            data.par_chunks_mut(width)
                .enumerate()
                .map(|(y, row)| f(y, row))
                .collect()
        }),
        None => data
            .chunks_mut(width)
            .enumerate()
            .map(|(y, row)| f(y, row))
            .collect(),
    }
}

/// Build a dedicated rayon pool; `threads: None` uses rayon's default sizing.
pub(crate) fn build_thread_pool(threads: Option<usize>) -> FlipResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(FlipError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| FlipError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/raster.rs"]
mod tests;
