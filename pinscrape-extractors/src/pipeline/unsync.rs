use futures::{stream, Stream};
use pinscrape_common::{
    log::debug,
    pin::PinRecord,
    tokio::{spawn, sync::mpsc::UnboundedSender, task::JoinHandle},
};

use super::{RunSummary, SearchPipeline};
use crate::{client::Transport, error::SearchFailure};

impl<T: Transport> SearchPipeline<T> {
    /// Lazy stream of records. Ends after the first failure or when the run is exhausted.
    pub fn into_stream(self) -> impl Stream<Item = Result<PinRecord, SearchFailure>> {
        stream::unfold(self, |mut pipeline| async move {
            pipeline.next_record().await.map(|item| (item, pipeline))
        })
    }

    /// Sends every record through `sender_channel` until the run ends.
    ///
    /// A closed channel cancels the run.
    pub async fn async_fetch(
        &mut self,
        sender_channel: UnboundedSender<PinRecord>,
    ) -> Result<RunSummary, SearchFailure> {
        debug!("Async extractor thread initialized");

        while let Some(item) = self.next_record().await {
            if sender_channel.send(item?).is_err() {
                debug!("Receiver dropped, stopping the search");
                self.cancel.cancel();
            }
        }

        debug!("Terminating thread.");
        Ok(self.summary())
    }
}

impl<T: Transport + 'static> SearchPipeline<T> {
    /// Runs [`async_fetch`](Self::async_fetch) on its own tokio task.
    pub fn setup_fetch_thread(
        self,
        sender_channel: UnboundedSender<PinRecord>,
    ) -> JoinHandle<Result<RunSummary, SearchFailure>> {
        spawn(async move {
            let mut pipeline = self;
            pipeline.async_fetch(sender_channel).await
        })
    }
}
