//! # QuoteWidget
//!
//! Polls one instrument through the host's CORS relay and turns the latest quote into a
//! small display tree.
//!
//! The host owns the lifecycle: it builds the widget, calls [`QuoteWidget::start`] with
//! its [`JobScheduler`], listens on [`QuoteWidget::subscribe`] and calls
//! [`QuoteWidget::render`] whenever a [`Refresh`] arrives, and finally calls
//! [`QuoteWidget::stop`].
//!
//! Failed polls never reach the display. Until the first good quote the widget shows a
//! loading line; after that it shows the most recent good quote.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc, PoisonError, RwLock,
};

use anyhow::Result;
use once_cell::sync::OnceCell;
use tokio::sync::{broadcast, Mutex};
use tokio_cron_scheduler::JobScheduler;
use uuid::Uuid;

use crate::{
    config::{App, WidgetConfig},
    cors,
    crawler::{tiingo::quote, HttpQuoteSource, QuoteSource},
    error::WidgetError,
    i18n::Translator,
    logging, scheduler,
};

pub mod dom;
pub mod render;
pub mod view_model;

use dom::Node;
use view_model::ViewModel;

/// Prefix of every log line the widget writes.
pub const NAME: &str = "SingleStock";

const REFRESH_CAPACITY: usize = 16;

/// Why the host should re-render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Refresh {
    /// The very first quote arrived; sent once, right before the matching `Updated`.
    FirstData,
    /// A new quote replaced the view model.
    Updated,
}

/// What happened to a successful response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Applied,
    /// A newer request was issued while this one was in flight; the result was dropped.
    Stale,
}

#[derive(Default)]
struct State {
    view_model: Option<ViewModel>,
    has_data: bool,
}

pub struct QuoteWidget {
    config: WidgetConfig,
    proxy_endpoint: String,
    source: Arc<dyn QuoteSource>,
    translator: Translator,
    /// Built on the first poll and kept for the widget's lifetime.
    url: OnceCell<String>,
    state: RwLock<State>,
    /// Sequence number of the most recently issued request.
    issued: AtomicU64,
    refresh: broadcast::Sender<Refresh>,
    job: Mutex<Option<Uuid>>,
}

impl QuoteWidget {
    /// # Errors
    ///
    /// [`WidgetError::Config`] when the configuration is unusable.
    pub fn new(
        config: WidgetConfig,
        proxy_endpoint: impl Into<String>,
        source: Arc<dyn QuoteSource>,
        translator: Translator,
    ) -> Result<Self, WidgetError> {
        config.validate()?;
        let (refresh, _) = broadcast::channel(REFRESH_CAPACITY);

        Ok(QuoteWidget {
            config,
            proxy_endpoint: proxy_endpoint.into(),
            source,
            translator,
            url: OnceCell::new(),
            state: RwLock::new(State::default()),
            issued: AtomicU64::new(0),
            refresh,
            job: Mutex::new(None),
        })
    }

    /// Widget wired to the real HTTP source, from application settings.
    pub fn from_settings(app: &App) -> Result<Self, WidgetError> {
        app.validate()?;

        QuoteWidget::new(
            app.widget.clone(),
            app.proxy.endpoint(),
            Arc::new(HttpQuoteSource::new(app.proxy.timeout())),
            Translator::new(&app.system.locale),
        )
    }

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    /// The relay URL every poll goes to.
    ///
    /// # Errors
    ///
    /// [`WidgetError::InvalidUrl`] if the quote URL cannot be built.
    pub fn url(&self) -> Result<&str, WidgetError> {
        self.url
            .get_or_try_init(|| {
                cors::build_cors_url(
                    &self.proxy_endpoint,
                    &quote::quote_url(&self.config.stock_symbol),
                    &quote::request_headers(&self.config.api_token),
                    &quote::EXPECTED_RESPONSE_HEADERS,
                )
            })
            .map(String::as_str)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Refresh> {
        self.refresh.subscribe()
    }

    pub fn view_model(&self) -> Option<ViewModel> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .view_model
            .clone()
    }

    pub fn has_data(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .has_data
    }

    /// Current display tree.
    pub fn render(&self) -> Node {
        render::render(self.view_model().as_ref(), &self.config, &self.translator)
    }

    /// One poll: fetch, map, and apply if no newer request was issued meanwhile.
    ///
    /// Recoverable errors are logged and returned; the view model is left untouched.
    pub async fn on_tick(&self) -> Result<TickOutcome, WidgetError> {
        let url = self.url()?;
        logging::info_file_async(format!("{} {}", NAME, cors::redact_request_headers(url)));

        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let outcome = match self.source.fetch(url).await {
            Ok(body) => view_model::map_response(&body, &self.config),
            Err(why) => Err(why),
        };

        match outcome {
            Ok(vm) => Ok(self.apply(seq, vm)),
            Err(why) => {
                logging::error_file_async(format!(
                    "{}: request #{} for {} failed because {}",
                    NAME, seq, self.config.stock_symbol, why
                ));
                Err(why)
            }
        }
    }

    fn apply(&self, seq: u64, vm: ViewModel) -> TickOutcome {
        let first = {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            let latest = self.issued.load(Ordering::SeqCst);
            if seq != latest {
                logging::warn_file_async(format!(
                    "{}: dropping response #{}, #{} is newer",
                    NAME, seq, latest
                ));
                return TickOutcome::Stale;
            }

            logging::debug_file_async(format!("{}: {:?}", NAME, vm));
            state.view_model = Some(vm);
            let first = !state.has_data;
            state.has_data = true;
            first
        };

        if first {
            self.notify(Refresh::FirstData);
        }
        self.notify(Refresh::Updated);

        TickOutcome::Applied
    }

    fn notify(&self, refresh: Refresh) {
        // Err only means nobody is subscribed yet
        let _ = self.refresh.send(refresh);
    }

    /// Polls once right away, then every `update_interval` on `sched`.
    ///
    /// Calling `start` on a running widget does nothing.
    ///
    /// # Errors
    ///
    /// Fails if the relay URL cannot be built or the job cannot be registered. A failed
    /// first poll is only logged.
    pub async fn start(self: &Arc<Self>, sched: &JobScheduler) -> Result<()> {
        let mut job = self.job.lock().await;
        if job.is_some() {
            return Ok(());
        }

        if let Err(why) = self.on_tick().await {
            if !why.is_recoverable() {
                return Err(why.into());
            }
        }

        let widget = Arc::clone(self);
        let id = scheduler::every(sched, self.config.update_interval(), move || {
            let widget = Arc::clone(&widget);
            async move {
                widget.on_tick().await?;
                Ok::<(), anyhow::Error>(())
            }
        })
        .await?;

        logging::info_file_async(format!(
            "{} started for {} every {:?}",
            NAME,
            self.config.stock_symbol,
            self.config.update_interval()
        ));
        *job = Some(id);

        Ok(())
    }

    /// Cancels the poll job. Responses still in flight are discarded.
    pub async fn stop(&self, sched: &JobScheduler) -> Result<()> {
        let mut job = self.job.lock().await;
        self.issued.fetch_add(1, Ordering::SeqCst);

        if let Some(id) = job.take() {
            scheduler::cancel(sched, &id).await?;
            logging::info_file_async(format!("{} stopped for {}", NAME, self.config.stock_symbol));
        }

        Ok(())
    }

    pub async fn is_running(&self) -> bool {
        self.job.lock().await.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::VecDeque,
        sync::{atomic::AtomicUsize, Mutex as StdMutex},
        time::Duration,
    };

    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use tokio::sync::oneshot;

    use super::*;
    use crate::config::ChangeType;

    const GOOG_FELL: &str = r#"[{"ticker":"GOOG","last":145.0,"prevClose":150.0}]"#;
    const GOOG_ROSE: &str = r#"[{"ticker":"GOOG","last":155.0,"prevClose":150.0}]"#;

    /// Answers each fetch with the next scripted result.
    #[derive(Default)]
    struct ScriptedSource {
        replies: StdMutex<VecDeque<Result<String, WidgetError>>>,
        urls: StdMutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn new(replies: Vec<Result<String, WidgetError>>) -> Self {
            ScriptedSource {
                replies: StdMutex::new(replies.into()),
                urls: StdMutex::default(),
            }
        }
    }

    #[async_trait]
    impl QuoteSource for ScriptedSource {
        async fn fetch(&self, url: &str) -> Result<String, WidgetError> {
            self.urls.lock().unwrap().push(url.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(WidgetError::Status(503)))
        }
    }

    /// Each fetch waits until the test releases it, so completions can be reordered.
    #[derive(Default)]
    struct GatedSource {
        gates: StdMutex<VecDeque<oneshot::Receiver<Result<String, WidgetError>>>>,
        calls: AtomicUsize,
    }

    impl GatedSource {
        fn gate(&self) -> oneshot::Sender<Result<String, WidgetError>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl QuoteSource for GatedSource {
        async fn fetch(&self, _url: &str) -> Result<String, WidgetError> {
            let gate = self.gates.lock().unwrap().pop_front();
            self.calls.fetch_add(1, Ordering::SeqCst);
            match gate {
                Some(rx) => rx
                    .await
                    .unwrap_or_else(|_| Err(WidgetError::Transport("gate dropped".to_string()))),
                None => Err(WidgetError::Transport("no gate".to_string())),
            }
        }
    }

    fn widget_with(config: WidgetConfig, source: Arc<dyn QuoteSource>) -> Arc<QuoteWidget> {
        Arc::new(
            QuoteWidget::new(config, "http://localhost:8080/cors", source, Translator::default())
                .unwrap(),
        )
    }

    fn ok(body: &str) -> Result<String, WidgetError> {
        Ok(body.to_string())
    }

    async fn wait_for_calls(source: &GatedSource, n: usize) {
        while source.calls() < n {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_new_rejects_bad_config() {
        let config = WidgetConfig {
            update_interval: 0,
            ..Default::default()
        };
        let source: Arc<dyn QuoteSource> = Arc::new(ScriptedSource::default());
        assert!(matches!(
            QuoteWidget::new(config, "http://x/cors", source, Translator::default()),
            Err(WidgetError::Config(_))
        ));
    }

    #[test]
    fn test_url_is_built_once() {
        let config = WidgetConfig {
            api_token: "abc".to_string(),
            ..Default::default()
        };
        let widget = widget_with(config, Arc::new(ScriptedSource::default()));

        let url = widget.url().unwrap();
        assert_eq!(
            url,
            "http://localhost:8080/cors?sendheaders=Content-Type:application%2Fjson,Authorization:Token%20abc&expectedheaders=server,date,content-type,content-length,vary,x-frame-options&url=https://api.tiingo.com/iex/?tickers=GOOG"
        );
        assert!(std::ptr::eq(url, widget.url().unwrap()));
    }

    #[tokio::test]
    async fn test_first_success_notifies_twice() {
        let source = Arc::new(ScriptedSource::new(vec![ok(GOOG_FELL), ok(GOOG_ROSE)]));
        let widget = widget_with(WidgetConfig::default(), source.clone());
        let mut rx = widget.subscribe();

        assert!(!widget.has_data());
        assert_eq!(widget.on_tick().await.unwrap(), TickOutcome::Applied);
        assert!(widget.has_data());
        assert_eq!(rx.try_recv().unwrap(), Refresh::FirstData);
        assert_eq!(rx.try_recv().unwrap(), Refresh::Updated);
        assert!(rx.try_recv().is_err());

        assert_eq!(widget.on_tick().await.unwrap(), TickOutcome::Applied);
        assert_eq!(rx.try_recv().unwrap(), Refresh::Updated);
        assert!(rx.try_recv().is_err());

        let vm = widget.view_model().unwrap();
        assert_eq!(vm.price, 155.0);
        assert_eq!(vm.change, dec!(-5.00));

        let urls = source.urls.lock().unwrap();
        assert_eq!(urls.len(), 2);
        assert_eq!(urls[0], urls[1]);
    }

    #[tokio::test]
    async fn test_failures_keep_last_good_quote() {
        let source = Arc::new(ScriptedSource::new(vec![
            ok(GOOG_FELL),
            Err(WidgetError::Status(500)),
            ok("[]"),
            ok("<html>bad gateway</html>"),
            ok(r#"[{"ticker":"GOOG"}]"#),
            Err(WidgetError::Timeout(Duration::from_secs(15))),
        ]));
        let widget = widget_with(WidgetConfig::default(), source);
        widget.on_tick().await.unwrap();
        let good = widget.view_model();
        let mut rx = widget.subscribe();

        assert!(matches!(widget.on_tick().await, Err(WidgetError::Status(500))));
        assert!(matches!(widget.on_tick().await, Err(WidgetError::Data(_))));
        assert!(matches!(widget.on_tick().await, Err(WidgetError::Data(_))));
        assert!(matches!(widget.on_tick().await, Err(WidgetError::Data(_))));
        assert!(matches!(widget.on_tick().await, Err(WidgetError::Timeout(_))));

        assert_eq!(widget.view_model(), good);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_loading_until_first_success() {
        let source = Arc::new(ScriptedSource::new(vec![
            Err(WidgetError::Status(401)),
            Err(WidgetError::Status(500)),
            ok("not json"),
        ]));
        let config = WidgetConfig {
            stock_symbol: "AMZN".to_string(),
            ..Default::default()
        };
        let widget = widget_with(config, source);

        for _ in 0..3 {
            assert!(widget.on_tick().await.is_err());
            assert_eq!(widget.render().text_content(), "Loading AMZN ...");
        }
        assert!(!widget.has_data());
    }

    #[tokio::test]
    async fn test_render_after_data() {
        let config = WidgetConfig {
            colorized: true,
            change_type: ChangeType::Percent,
            ..Default::default()
        };
        let widget = widget_with(config, Arc::new(ScriptedSource::new(vec![ok(GOOG_FELL)])));
        widget.on_tick().await.unwrap();

        assert_eq!(
            widget.render().to_html(),
            concat!(
                "<div>",
                r#"<div><span>GOOG</span><span class="bright"> 145</span></div>"#,
                r#"<div class="dimmed small" style="color: #a3ea80">(3.33%)</div>"#,
                "</div>"
            )
        );
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let source = Arc::new(GatedSource::default());
        let first_gate = source.gate();
        let second_gate = source.gate();
        let widget = widget_with(WidgetConfig::default(), source.clone());

        let w = Arc::clone(&widget);
        let first = tokio::spawn(async move { w.on_tick().await });
        wait_for_calls(&source, 1).await;

        let w = Arc::clone(&widget);
        let second = tokio::spawn(async move { w.on_tick().await });
        wait_for_calls(&source, 2).await;

        second_gate.send(ok(GOOG_ROSE)).unwrap();
        assert_eq!(second.await.unwrap().unwrap(), TickOutcome::Applied);

        first_gate.send(ok(GOOG_FELL)).unwrap();
        assert_eq!(first.await.unwrap().unwrap(), TickOutcome::Stale);

        assert_eq!(widget.view_model().unwrap().price, 155.0);
    }

    #[tokio::test]
    async fn test_start_and_stop() {
        let mut sched = scheduler::start().await.unwrap();
        let config = WidgetConfig {
            update_interval: 1000,
            ..Default::default()
        };
        let source = Arc::new(ScriptedSource::new(vec![
            ok(GOOG_FELL),
            ok(GOOG_ROSE),
            ok(GOOG_ROSE),
            ok(GOOG_ROSE),
            ok(GOOG_ROSE),
        ]));
        let widget = widget_with(config, source.clone());

        widget.start(&sched).await.unwrap();
        // the immediate poll has already completed
        assert!(widget.has_data());
        assert!(widget.is_running().await);

        // a second start is a no-op
        widget.start(&sched).await.unwrap();
        assert_eq!(source.urls.lock().unwrap().len(), 1);

        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert!(source.urls.lock().unwrap().len() >= 2);
        assert_eq!(widget.view_model().unwrap().price, 155.0);

        widget.stop(&sched).await.unwrap();
        assert!(!widget.is_running().await);
        tokio::time::sleep(Duration::from_millis(200)).await;
        let polls = source.urls.lock().unwrap().len();

        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(source.urls.lock().unwrap().len(), polls);

        sched.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_discards_in_flight() {
        let sched = scheduler::start().await.unwrap();
        let source = Arc::new(GatedSource::default());
        let gate = source.gate();
        let widget = widget_with(WidgetConfig::default(), source.clone());

        let w = Arc::clone(&widget);
        let pending = tokio::spawn(async move { w.on_tick().await });
        wait_for_calls(&source, 1).await;

        widget.stop(&sched).await.unwrap();
        gate.send(ok(GOOG_FELL)).unwrap();

        assert_eq!(pending.await.unwrap().unwrap(), TickOutcome::Stale);
        assert!(!widget.has_data());
    }
}
