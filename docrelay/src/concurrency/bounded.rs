use futures::future::join_all;
use std::future::Future;

/// Runs `f` over `items` with at most `chunk_size` futures in flight.
///
/// Items are split into consecutive chunks of `chunk_size` elements. All futures of a chunk
/// are polled concurrently and the next chunk starts only once every future of the
/// current one has completed. The output at index `i` is the output of the `i`-th item,
/// regardless of the order in which futures completed.
///
/// `f` is expected to be infallible: callers encode per-item failures in the output type so
/// that one item never prevents its siblings or later chunks from running. A `chunk_size` of
/// zero is treated as one.
pub async fn run_bounded<I, O, F, Fut>(items: Vec<I>, chunk_size: usize, f: F) -> Vec<O>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = O>,
{
    let chunk_size = chunk_size.max(1);
    let mut outputs = Vec::with_capacity(items.len());

    let mut items = items.into_iter().peekable();
    while items.peek().is_some() {
        let chunk: Vec<Fut> = items.by_ref().take(chunk_size).map(&f).collect();
        outputs.extend(join_all(chunk).await);
    }

    outputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn output_order_matches_input_order() {
        let items: Vec<u64> = (0..23).collect();

        // Later items of each chunk finish first.
        let outputs = run_bounded(items.clone(), 5, |item| async move {
            tokio::time::sleep(Duration::from_millis(100 - item * 3)).await;
            item * 10
        })
        .await;

        assert_eq!(
            outputs,
            items.iter().map(|item| item * 10).collect::<Vec<_>>()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_futures_never_exceed_chunk_size() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_in_flight = Arc::new(AtomicUsize::new(0));

        run_bounded((0..17).collect::<Vec<u64>>(), 4, |item| {
            let in_flight = in_flight.clone();
            let max_in_flight = max_in_flight.clone();
            async move {
                let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                max_in_flight.fetch_max(current, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10 + item % 3)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
        })
        .await;

        assert_eq!(max_in_flight.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn chunks_run_strictly_one_after_the_other() {
        let events = Arc::new(Mutex::new(Vec::new()));

        run_bounded((0..6).collect::<Vec<u64>>(), 3, |item| {
            let events = events.clone();
            async move {
                events.lock().unwrap().push(("start", item));
                // The first item of each chunk is the slowest one.
                let delay = if item % 3 == 0 { 50 } else { 5 };
                tokio::time::sleep(Duration::from_millis(delay)).await;
                events.lock().unwrap().push(("end", item));
            }
        })
        .await;

        let events = events.lock().unwrap();
        let first_start_of_second_chunk = events
            .iter()
            .position(|event| *event == ("start", 3))
            .unwrap();
        let last_end_of_first_chunk = events
            .iter()
            .position(|event| *event == ("end", 0))
            .unwrap();

        assert!(last_end_of_first_chunk < first_start_of_second_chunk);
    }

    #[tokio::test]
    async fn zero_chunk_size_runs_one_by_one() {
        let outputs = run_bounded(vec![1, 2, 3], 0, |item| async move { item + 1 }).await;

        assert_eq!(outputs, vec![2, 3, 4]);
    }

    #[tokio::test]
    async fn empty_input_yields_empty_output() {
        let outputs = run_bounded(Vec::<u8>::new(), 8, |item| async move { item }).await;

        assert!(outputs.is_empty());
    }
}
