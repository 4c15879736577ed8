use std::path::PathBuf;

use ccfarm_datastore::DataStore;

use crate::{
    agents::{debriefer::Debriefer, satirist::Satirist, scout::NewsScout, Backoff},
    llm::LanguageModel,
    media::{PrivacyStatus, Studio, VideoUploader},
    news::NewsSource,
    notify::TeamsWebhook,
    ContentFarm,
};

pub struct ContentFarmBuilder<D = (), N = (), L = (), P = (), U = ()> {
    workdir: PathBuf,
    store: D,
    news: N,
    llm: L,
    studio: P,
    uploader: U,
    notifier: Option<TeamsWebhook>,
    backoff: Backoff,
    privacy: PrivacyStatus,
    dry_run: bool,
}

impl ContentFarmBuilder {
    pub fn new(workdir: impl Into<PathBuf>) -> Self {
        Self {
            workdir: workdir.into(),
            store: (),
            news: (),
            llm: (),
            studio: (),
            uploader: (),
            notifier: None,
            backoff: Backoff::default(),
            privacy: PrivacyStatus::default(),
            dry_run: false,
        }
    }
}

impl<D, N, L, P, U> ContentFarmBuilder<D, N, L, P, U> {
    pub fn store<D2: DataStore + Send + Sync + 'static>(
        self,
        store: D2,
    ) -> ContentFarmBuilder<D2, N, L, P, U> {
        ContentFarmBuilder {
            workdir: self.workdir,
            store,
            news: self.news,
            llm: self.llm,
            studio: self.studio,
            uploader: self.uploader,
            notifier: self.notifier,
            backoff: self.backoff,
            privacy: self.privacy,
            dry_run: self.dry_run,
        }
    }

    pub fn news<N2: NewsSource + Send + Sync + 'static>(
        self,
        news: N2,
    ) -> ContentFarmBuilder<D, N2, L, P, U> {
        ContentFarmBuilder {
            workdir: self.workdir,
            store: self.store,
            news,
            llm: self.llm,
            studio: self.studio,
            uploader: self.uploader,
            notifier: self.notifier,
            backoff: self.backoff,
            privacy: self.privacy,
            dry_run: self.dry_run,
        }
    }

    /// Model shared by the scout, the debriefer and the satirist
    pub fn llm<L2: LanguageModel + Clone + Send + Sync + 'static>(
        self,
        llm: L2,
    ) -> ContentFarmBuilder<D, N, L2, P, U> {
        ContentFarmBuilder {
            workdir: self.workdir,
            store: self.store,
            news: self.news,
            llm,
            studio: self.studio,
            uploader: self.uploader,
            notifier: self.notifier,
            backoff: self.backoff,
            privacy: self.privacy,
            dry_run: self.dry_run,
        }
    }

    pub fn studio<P2: Studio + Send + Sync + 'static>(
        self,
        studio: P2,
    ) -> ContentFarmBuilder<D, N, L, P2, U> {
        ContentFarmBuilder {
            workdir: self.workdir,
            store: self.store,
            news: self.news,
            llm: self.llm,
            studio,
            uploader: self.uploader,
            notifier: self.notifier,
            backoff: self.backoff,
            privacy: self.privacy,
            dry_run: self.dry_run,
        }
    }

    pub fn uploader<U2: VideoUploader + Send + Sync + 'static>(
        self,
        uploader: U2,
    ) -> ContentFarmBuilder<D, N, L, P, U2> {
        ContentFarmBuilder {
            workdir: self.workdir,
            store: self.store,
            news: self.news,
            llm: self.llm,
            studio: self.studio,
            uploader,
            notifier: self.notifier,
            backoff: self.backoff,
            privacy: self.privacy,
            dry_run: self.dry_run,
        }
    }

    pub fn notifier(mut self, notifier: Option<TeamsWebhook>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn privacy(mut self, privacy: PrivacyStatus) -> Self {
        self.privacy = privacy;
        self
    }

    /// Render videos but never upload them
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

impl<D, N, L, P, U> ContentFarmBuilder<D, N, L, P, U>
where
    D: DataStore + Send + Sync + 'static,
    N: NewsSource + Send + Sync + 'static,
    L: LanguageModel + Clone + Send + Sync + 'static,
    P: Studio + Send + Sync + 'static,
    U: VideoUploader + Send + Sync + 'static,
{
    pub fn build(self) -> ContentFarm<D, N, L, P, U> {
        ContentFarm {
            workdir: self.workdir,
            store: self.store,
            news: self.news,
            scout: NewsScout::new(self.llm.clone()).with_backoff(self.backoff),
            debriefer: Debriefer::new(self.llm.clone()).with_backoff(self.backoff),
            satirist: Satirist::new(self.llm).with_backoff(self.backoff),
            studio: self.studio,
            uploader: self.uploader,
            notifier: self.notifier,
            privacy: self.privacy,
            dry_run: self.dry_run,
        }
    }
}
