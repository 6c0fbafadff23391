//! In-memory producer
//!
//! `LocalProducer` serves a catalog of portlets from the consumer's own
//! process. Rendering and interaction logic is supplied per portlet through
//! [`PortletBehavior`]; portlets without a registered behavior fall back to
//! [`TemplatePortlet`].

use crate::error::ProducerErrorBuilder;
use crate::portlet_info::PortletInfo;
use crate::producer::Producer;
use crate::types::{
    BlockingInteractionResponse, CacheControl, Event, EventFailure, EventParams,
    HandleEventsResponse, InteractionParams, Lifetime, MarkupContext, MarkupParams,
    PortletMode, RegistrationContext, RegistrationData, RegistrationHandle, RuntimeContext,
    ServiceDescription, UpdateResponse, UserContext, WindowState,
};
use async_trait::async_trait;
use clouber_core::Result;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

const DEFAULT_TEMPLATE: &str = "<div class=\"portlet\">{title}</div>";

/// Everything a behavior needs to know about the call it serves
#[derive(Debug, Clone, Copy)]
pub struct PortletRequest<'a> {
    /// Description of the portlet being invoked
    pub info: &'a PortletInfo,
    /// Window runtime context
    pub runtime: &'a RuntimeContext,
    /// End user
    pub user: &'a UserContext,
    /// Markup parameters of the call
    pub markup_params: &'a MarkupParams,
    /// Negotiated mime type
    pub mime_type: &'a str,
}

impl PortletRequest<'_> {
    /// Current navigational state, empty when there is none
    pub fn state(&self) -> &str {
        self.markup_params.navigational_state.as_deref().unwrap_or_default()
    }
}

/// Rendering and interaction logic of a local portlet
pub trait PortletBehavior: Send + Sync {
    /// Render markup for the request
    fn render(&self, request: &PortletRequest<'_>) -> Result<String>;

    /// Process an interaction.
    ///
    /// The default stores the interaction state as navigational state,
    /// honors `mode`, `windowState` and `redirect` form parameters, and
    /// publishes every declared published event with the interaction state
    /// as payload.
    fn process_action(
        &self,
        request: &PortletRequest<'_>,
        interaction: &InteractionParams,
    ) -> Result<BlockingInteractionResponse> {
        let form = |name: &str| {
            interaction
                .form_parameters
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str())
        };

        if let Some(url) = form("redirect") {
            return Ok(BlockingInteractionResponse::Redirect(url.to_string()));
        }

        let state = interaction.interaction_state.clone();
        let payload = state
            .as_ref()
            .map(|s| serde_json::Value::String(s.clone()))
            .unwrap_or(serde_json::Value::Null);
        let events = request
            .info
            .published_events()
            .iter()
            .map(|name| Event::with_payload(name.clone(), payload.clone()))
            .collect();

        Ok(BlockingInteractionResponse::Update(UpdateResponse {
            navigational_state: state,
            new_mode: form("mode").map(|m| PortletMode::from(m.to_string())),
            new_window_state: form("windowState").map(|s| WindowState::from(s.to_string())),
            events,
            markup_context: None,
        }))
    }

    /// Process one event. The default records `name=payload` as navigational state.
    fn process_event(&self, _request: &PortletRequest<'_>, event: &Event) -> Result<UpdateResponse> {
        let payload = match &event.payload {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Ok(UpdateResponse {
            navigational_state: Some(format!("{}={payload}", event.name)),
            ..UpdateResponse::default()
        })
    }
}

/// Behavior rendering the `markup` init parameter as a template.
///
/// Recognized placeholders: `{title}`, `{mode}`, `{windowState}`, `{state}`
/// and `{namespace}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplatePortlet;

impl PortletBehavior for TemplatePortlet {
    fn render(&self, request: &PortletRequest<'_>) -> Result<String> {
        let template = request.info.init_param("markup").unwrap_or(DEFAULT_TEMPLATE);
        Ok(template
            .replace("{title}", request.info.title())
            .replace("{mode}", request.markup_params.mode.as_str())
            .replace("{windowState}", request.markup_params.window_state.as_str())
            .replace("{state}", request.state())
            .replace("{namespace}", &request.runtime.namespace_prefix))
    }
}

#[derive(Debug, Clone)]
struct RegistrationRecord {
    consumer_name: String,
    lifetime: Option<Lifetime>,
}

/// Producer serving a portlet catalog from memory
pub struct LocalProducer {
    name: String,
    portlets: Vec<PortletInfo>,
    behaviors: HashMap<String, Arc<dyn PortletBehavior>>,
    fallback: Arc<dyn PortletBehavior>,
    allowed_consumers: Option<HashSet<String>>,
    locales: Vec<String>,
    available: AtomicBool,
    registrations: RwLock<HashMap<RegistrationHandle, RegistrationRecord>>,
}

impl LocalProducer {
    /// Create a producer offering `portlets`
    pub fn new(name: impl Into<String>, portlets: Vec<PortletInfo>) -> Self {
        Self {
            name: name.into(),
            portlets,
            behaviors: HashMap::new(),
            fallback: Arc::new(TemplatePortlet),
            allowed_consumers: None,
            locales: vec!["en".to_string(), "zh".to_string()],
            available: AtomicBool::new(true),
            registrations: RwLock::new(HashMap::new()),
        }
    }

    /// Attach a behavior to a portlet handle
    pub fn with_behavior(
        mut self,
        portlet_handle: impl Into<String>,
        behavior: Arc<dyn PortletBehavior>,
    ) -> Self {
        self.behaviors.insert(portlet_handle.into(), behavior);
        self
    }

    /// Only accept registrations from the listed consumers
    pub fn with_allowed_consumers<I, S>(mut self, consumers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_consumers = Some(consumers.into_iter().map(Into::into).collect());
        self
    }

    /// Locales advertised in the service description
    pub fn with_locales(mut self, locales: Vec<String>) -> Self {
        self.locales = locales;
        self
    }

    /// Producer name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simulate the producer going down or coming back
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    /// Number of distinct registrations held
    pub fn registration_count(&self) -> usize {
        self.registrations.read().len()
    }

    fn ensure_available(&self, call: &str) -> Result<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ProducerErrorBuilder::unreachable(call, &self.name))
        }
    }

    fn registration(&self, call: &str, context: &RegistrationContext) -> Result<RegistrationRecord> {
        self.registrations
            .read()
            .get(&context.registration_handle)
            .cloned()
            .ok_or_else(|| {
                ProducerErrorBuilder::invalid_registration(call, context.registration_handle.as_str())
            })
    }

    fn portlet(&self, call: &str, handle: &str) -> Result<&PortletInfo> {
        self.portlets
            .iter()
            .find(|info| info.portlet_id() == handle)
            .ok_or_else(|| ProducerErrorBuilder::portlet_not_found(call, handle))
    }

    fn behavior(&self, handle: &str) -> Arc<dyn PortletBehavior> {
        self.behaviors
            .get(handle)
            .cloned()
            .unwrap_or_else(|| Arc::clone(&self.fallback))
    }

    fn negotiate<'a>(
        &self,
        call: &str,
        info: &'a PortletInfo,
        params: &'a MarkupParams,
    ) -> Result<&'a str> {
        info.negotiate(&params.mime_types).ok_or_else(|| {
            ProducerErrorBuilder::unsupported_mime_type(call, info.portlet_id(), &params.mime_types)
        })
    }

    fn handle_for(&self, registration: &RegistrationData) -> RegistrationHandle {
        let key = format!(
            "{}\u{0}{}\u{0}{}",
            self.name, registration.consumer_name, registration.consumer_agent
        );
        RegistrationHandle(Uuid::new_v5(&Uuid::NAMESPACE_OID, key.as_bytes()).to_string())
    }
}

#[async_trait]
impl Producer for LocalProducer {
    async fn register(
        &self,
        registration: RegistrationData,
        lifetime: Option<Lifetime>,
        _user: &UserContext,
    ) -> Result<RegistrationContext> {
        const CALL: &str = "LocalProducer::register";
        self.ensure_available(CALL)?;

        let consumer = registration.consumer_name.trim();
        if consumer.is_empty() {
            return Err(ProducerErrorBuilder::registration_refused(
                CALL,
                "consumer name must not be empty",
            ));
        }
        if let Some(allowed) = &self.allowed_consumers {
            if !allowed.contains(consumer) {
                return Err(ProducerErrorBuilder::registration_refused(
                    CALL,
                    format!("consumer '{consumer}' is not allowed by producer '{}'", self.name),
                ));
            }
        }

        let handle = self.handle_for(&registration);
        let record = RegistrationRecord {
            consumer_name: consumer.to_string(),
            lifetime,
        };
        let fresh = self
            .registrations
            .write()
            .insert(handle.clone(), record)
            .is_none();
        info!(producer = %self.name, consumer, handle = %handle, fresh, "registered consumer");

        Ok(RegistrationContext {
            registration_handle: handle,
            registration_state: None,
            scheduled_destruction: lifetime,
        })
    }

    async fn get_service_description(
        &self,
        registration: &RegistrationContext,
        desired_locales: &[String],
        portlet_handles: Option<&[String]>,
        _user: &UserContext,
    ) -> Result<ServiceDescription> {
        const CALL: &str = "LocalProducer::get_service_description";
        self.ensure_available(CALL)?;
        let record = self.registration(CALL, registration)?;

        let offered_portlets: Vec<PortletInfo> = self
            .portlets
            .iter()
            .filter(|info| {
                portlet_handles.map_or(true, |handles| {
                    handles.iter().any(|handle| handle == info.portlet_id())
                })
            })
            .cloned()
            .collect();

        let fresh_context = record.lifetime.and_then(|lifetime| {
            lifetime.refresh_duration.map(|refresh| RegistrationContext {
                registration_handle: registration.registration_handle.clone(),
                registration_state: registration.registration_state.clone(),
                scheduled_destruction: Some(Lifetime {
                    termination_after: lifetime.termination_after + refresh,
                    refresh_duration: Some(refresh),
                }),
            })
        });

        debug!(
            producer = %self.name,
            consumer = %record.consumer_name,
            offered = offered_portlets.len(),
            ?desired_locales,
            "service description"
        );

        Ok(ServiceDescription {
            offered_portlets,
            requires_registration: true,
            locales: self.locales.clone(),
            registration_context: fresh_context,
        })
    }

    async fn perform_blocking_interaction(
        &self,
        registration: &RegistrationContext,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
        interaction: &InteractionParams,
    ) -> Result<BlockingInteractionResponse> {
        const CALL: &str = "LocalProducer::perform_blocking_interaction";
        self.ensure_available(CALL)?;
        self.registration(CALL, registration)?;
        let info = self.portlet(CALL, portlet_handle)?;
        let mime_type = self.negotiate(CALL, info, markup_params)?;

        let request = PortletRequest {
            info,
            runtime,
            user,
            markup_params,
            mime_type,
        };
        self.behavior(portlet_handle)
            .process_action(&request, interaction)
            .map_err(|err| {
                ProducerErrorBuilder::interaction_failed(CALL, portlet_handle, err.to_string())
            })
    }

    async fn handle_events(
        &self,
        registration: &RegistrationContext,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
        events: &EventParams,
    ) -> Result<HandleEventsResponse> {
        const CALL: &str = "LocalProducer::handle_events";
        self.ensure_available(CALL)?;
        self.registration(CALL, registration)?;
        let info = self.portlet(CALL, portlet_handle)?;
        let mime_type = self.negotiate(CALL, info, markup_params)?;
        let behavior = self.behavior(portlet_handle);

        let mut params = markup_params.clone();
        let mut response = HandleEventsResponse::default();
        for event in &events.events {
            if !info.handles_event(&event.name) {
                response.failed_events.push(EventFailure {
                    name: event.name.clone(),
                    reason: format!("portlet '{portlet_handle}' does not handle this event"),
                });
                continue;
            }

            let request = PortletRequest {
                info,
                runtime,
                user,
                markup_params: &params,
                mime_type,
            };
            let update = behavior.process_event(&request, event).map_err(|err| {
                ProducerErrorBuilder::event_handling_failed(CALL, portlet_handle, err.to_string())
            })?;

            if update.navigational_state.is_some() {
                params.navigational_state.clone_from(&update.navigational_state);
                response.update.navigational_state = update.navigational_state;
            }
            if let Some(mode) = update.new_mode {
                params.mode = mode.clone();
                response.update.new_mode = Some(mode);
            }
            if let Some(state) = update.new_window_state {
                params.window_state = state.clone();
                response.update.new_window_state = Some(state);
            }
            response.update.events.extend(update.events);
            if update.markup_context.is_some() {
                response.update.markup_context = update.markup_context;
            }
        }

        debug!(
            producer = %self.name,
            portlet = portlet_handle,
            delivered = events.events.len() - response.failed_events.len(),
            failed = response.failed_events.len(),
            "handled events"
        );
        Ok(response)
    }

    async fn get_markup(
        &self,
        registration: &RegistrationContext,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
    ) -> Result<MarkupContext> {
        const CALL: &str = "LocalProducer::get_markup";
        self.ensure_available(CALL)?;
        self.registration(CALL, registration)?;
        let info = self.portlet(CALL, portlet_handle)?;
        let mime_type = self.negotiate(CALL, info, markup_params)?;

        if !info.supports(mime_type, &markup_params.mode) {
            return Err(ProducerErrorBuilder::unsupported_mode(
                CALL,
                portlet_handle,
                markup_params.mode.as_str(),
            ));
        }
        if info.only_secure() && !markup_params.secure_client_communication {
            return Err(ProducerErrorBuilder::markup_failed(
                CALL,
                portlet_handle,
                "portlet requires secure client communication",
            ));
        }

        let request = PortletRequest {
            info,
            runtime,
            user,
            markup_params,
            mime_type,
        };
        let markup = self
            .behavior(portlet_handle)
            .render(&request)
            .map_err(|err| ProducerErrorBuilder::markup_failed(CALL, portlet_handle, err.to_string()))?;

        let cache_control = info
            .init_param("cacheExpires")
            .and_then(|raw| raw.trim().parse::<i64>().ok())
            .map(|expires| CacheControl {
                expires,
                user_scope: "private".to_string(),
                validate_tag: None,
            });

        Ok(MarkupContext {
            requires_rewriting: markup.contains("wsrp_rewrite_"),
            markup,
            mime_type: mime_type.to_string(),
            locale: markup_params.locales.first().cloned(),
            preferred_title: Some(info.title().to_string()),
            cache_control,
        })
    }

    fn producer_kind(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portlet_info::MarkupType;
    use clouber_core::ErrorCode;

    fn producer() -> LocalProducer {
        let mut clock = PortletInfo::new("clock").unwrap();
        clock.add_markup_type(MarkupType::new("text/html", vec![PortletMode::View]));
        clock.set_init_param("markup", "<span>{title}:{mode}:{state}</span>");
        clock.add_handled_event("tick");
        clock.add_published_event("alarm");
        LocalProducer::new("local", vec![clock])
    }

    fn params() -> MarkupParams {
        MarkupParams {
            mime_types: vec!["text/html".into()],
            ..MarkupParams::default()
        }
    }

    #[tokio::test]
    async fn test_registration_is_idempotent() {
        let producer = producer();
        let user = UserContext::anonymous();
        let first = producer
            .register(RegistrationData::new("portal", "clouber/0.2"), None, &user)
            .await
            .unwrap();
        let second = producer
            .register(RegistrationData::new("portal", "clouber/0.2"), None, &user)
            .await
            .unwrap();
        assert_eq!(first.registration_handle, second.registration_handle);
        assert_eq!(producer.registration_count(), 1);

        let other = producer
            .register(RegistrationData::new("other", "clouber/0.2"), None, &user)
            .await
            .unwrap();
        assert_ne!(first.registration_handle, other.registration_handle);
    }

    #[tokio::test]
    async fn test_unknown_handle_is_rejected() {
        let producer = producer();
        let bogus = RegistrationContext {
            registration_handle: RegistrationHandle("bogus".into()),
            registration_state: None,
            scheduled_destruction: None,
        };
        let err = producer
            .get_markup(
                &bogus,
                "clock",
                &RuntimeContext::for_namespace("w1"),
                &UserContext::anonymous(),
                &params(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidRegistration);
    }

    #[tokio::test]
    async fn test_markup_uses_template_and_checks_mode() {
        let producer = producer();
        let user = UserContext::anonymous();
        let ctx = producer
            .register(RegistrationData::new("portal", "clouber/0.2"), None, &user)
            .await
            .unwrap();
        let runtime = RuntimeContext::for_namespace("w1");

        let markup = producer
            .get_markup(&ctx, "clock", &runtime, &user, &params())
            .await
            .unwrap();
        assert_eq!(markup.markup, "<span>clock:view:</span>");
        assert_eq!(markup.cache_control, None);

        let edit = MarkupParams {
            mode: PortletMode::Edit,
            ..params()
        };
        let err = producer
            .get_markup(&ctx, "clock", &runtime, &user, &edit)
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::UnsupportedMode);
    }

    #[tokio::test]
    async fn test_unhandled_events_are_reported_not_failed() {
        let producer = producer();
        let user = UserContext::anonymous();
        let ctx = producer
            .register(RegistrationData::new("portal", "clouber/0.2"), None, &user)
            .await
            .unwrap();

        let events = EventParams {
            events: vec![
                Event::with_payload("tick", serde_json::json!("12:00")),
                Event::new("unknown"),
            ],
        };
        let response = producer
            .handle_events(
                &ctx,
                "clock",
                &RuntimeContext::for_namespace("w1"),
                &user,
                &params(),
                &events,
            )
            .await
            .unwrap();
        assert_eq!(response.update.navigational_state.as_deref(), Some("tick=12:00"));
        assert_eq!(response.failed_events.len(), 1);
        assert_eq!(response.failed_events[0].name, "unknown");
    }

    #[tokio::test]
    async fn test_unavailable_producer() {
        let producer = producer();
        producer.set_available(false);
        let err = producer
            .register(
                RegistrationData::new("portal", "clouber/0.2"),
                None,
                &UserContext::anonymous(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::ProducerUnreachable);
    }
}
