//! Consumer-side handle on one producer
//!
//! A `ProducerConnection` owns the registration context for its
//! consumer/producer pair. Operations other than `register` fail with
//! `NotRegistered` until a context has been established.

use crate::error::ProducerErrorBuilder;
use crate::producer::Producer;
use crate::types::{
    BlockingInteractionResponse, EventParams, HandleEventsResponse, InteractionParams, Lifetime,
    MarkupContext, MarkupParams, RegistrationContext, RegistrationData, RuntimeContext,
    ServiceDescription, UserContext,
};
use clouber_core::Result;
use parking_lot::{Mutex, RwLock};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

/// Connection from the consumer to a single producer
pub struct ProducerConnection {
    id: String,
    url: String,
    producer: Arc<dyn Producer>,
    context: RwLock<Option<RegistrationContext>>,
    in_flight: Mutex<HashSet<String>>,
}

impl fmt::Debug for ProducerConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProducerConnection")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("kind", &self.producer.producer_kind())
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// Marks a window namespace busy for the duration of an interaction
struct InteractionGuard<'a> {
    in_flight: &'a Mutex<HashSet<String>>,
    namespace: String,
}

impl Drop for InteractionGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.lock().remove(&self.namespace);
    }
}

impl ProducerConnection {
    /// Connection to `producer`, identified by `id` and `url`
    pub fn new(id: impl Into<String>, url: impl Into<String>, producer: Arc<dyn Producer>) -> Self {
        Self {
            id: id.into(),
            url: url.into(),
            producer,
            context: RwLock::new(None),
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    /// Producer id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Producer URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Kind of the underlying producer
    pub fn producer_kind(&self) -> &'static str {
        self.producer.producer_kind()
    }

    /// Whether a registration context is held
    pub fn is_registered(&self) -> bool {
        self.context.read().is_some()
    }

    /// Copy of the held registration context
    pub fn registration_context(&self) -> Option<RegistrationContext> {
        self.context.read().clone()
    }

    fn require_context(&self, call: &str) -> Result<RegistrationContext> {
        self.context
            .read()
            .clone()
            .ok_or_else(|| ProducerErrorBuilder::not_registered(call, &self.id))
    }

    /// Register with the producer.
    ///
    /// While registered the held context is returned without contacting the
    /// producer.
    pub async fn register(
        &self,
        registration: RegistrationData,
        lifetime: Option<Lifetime>,
        user: &UserContext,
    ) -> Result<RegistrationContext> {
        if let Some(existing) = self.registration_context() {
            debug!(producer = %self.id, handle = %existing.registration_handle, "already registered");
            return Ok(existing);
        }

        let consumer = registration.consumer_name.clone();
        let context = self.producer.register(registration, lifetime, user).await?;
        info!(
            producer = %self.id,
            url = %self.url,
            consumer = %consumer,
            handle = %context.registration_handle,
            "registered with producer"
        );
        *self.context.write() = Some(context.clone());
        Ok(context)
    }

    /// Drop the registration context. Later calls fail with `NotRegistered`.
    pub fn destroy(&self) {
        if let Some(context) = self.context.write().take() {
            info!(producer = %self.id, handle = %context.registration_handle, "dropped registration");
        }
    }

    /// Fetch the producer's service description
    pub async fn get_service_description(
        &self,
        desired_locales: &[String],
        portlet_handles: Option<&[String]>,
        user: &UserContext,
    ) -> Result<ServiceDescription> {
        let context = self.require_context("ProducerConnection::get_service_description")?;
        debug!(producer = %self.id, filter = ?portlet_handles, "get_service_description");

        let description = self
            .producer
            .get_service_description(&context, desired_locales, portlet_handles, user)
            .await?;

        if let Some(fresh) = &description.registration_context {
            debug!(producer = %self.id, "producer issued a fresh registration context");
            *self.context.write() = Some(fresh.clone());
        }
        Ok(description)
    }

    /// Run a blocking interaction.
    ///
    /// Only one interaction may run per window namespace; a second one fails
    /// immediately with `InteractionInProgress`.
    pub async fn perform_blocking_interaction(
        &self,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
        interaction: &InteractionParams,
    ) -> Result<BlockingInteractionResponse> {
        const CALL: &str = "ProducerConnection::perform_blocking_interaction";
        let context = self.require_context(CALL)?;

        let namespace = runtime.namespace_prefix.clone();
        if !self.in_flight.lock().insert(namespace.clone()) {
            return Err(ProducerErrorBuilder::interaction_in_progress(CALL, &namespace));
        }
        let _guard = InteractionGuard {
            in_flight: &self.in_flight,
            namespace,
        };

        debug!(producer = %self.id, portlet = portlet_handle, "perform_blocking_interaction");
        self.producer
            .perform_blocking_interaction(
                &context,
                portlet_handle,
                runtime,
                user,
                markup_params,
                interaction,
            )
            .await
    }

    /// Deliver events to a portlet
    pub async fn handle_events(
        &self,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
        events: &EventParams,
    ) -> Result<HandleEventsResponse> {
        let context = self.require_context("ProducerConnection::handle_events")?;
        debug!(
            producer = %self.id,
            portlet = portlet_handle,
            events = events.events.len(),
            "handle_events"
        );
        self.producer
            .handle_events(&context, portlet_handle, runtime, user, markup_params, events)
            .await
    }

    /// Fetch a markup fragment
    pub async fn get_markup(
        &self,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
    ) -> Result<MarkupContext> {
        let context = self.require_context("ProducerConnection::get_markup")?;
        debug!(producer = %self.id, portlet = portlet_handle, "get_markup");
        self.producer
            .get_markup(&context, portlet_handle, runtime, user, markup_params)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::LocalProducer;
    use crate::portlet_info::PortletInfo;
    use clouber_core::ErrorCode;
    use std::time::Duration;

    fn connection() -> ProducerConnection {
        let portlets = vec![PortletInfo::new("hello").unwrap()];
        ProducerConnection::new(
            "local",
            "local://hello",
            Arc::new(LocalProducer::new("local", portlets)),
        )
    }

    #[tokio::test]
    async fn test_calls_require_registration() {
        let conn = connection();
        let err = conn
            .get_markup(
                "hello",
                &RuntimeContext::for_namespace("w1"),
                &UserContext::anonymous(),
                &MarkupParams::default(),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::NotRegistered);
        assert_eq!(err.call(), "ProducerConnection::get_markup");
    }

    #[tokio::test]
    async fn test_fresh_context_replaces_stored_one() {
        let conn = connection();
        let user = UserContext::anonymous();
        let lifetime = Lifetime {
            termination_after: Duration::from_secs(60),
            refresh_duration: Some(Duration::from_secs(30)),
        };
        conn.register(RegistrationData::new("portal", "clouber"), Some(lifetime), &user)
            .await
            .unwrap();

        conn.get_service_description(&[], None, &user).await.unwrap();
        let stored = conn.registration_context().unwrap();
        assert_eq!(
            stored.scheduled_destruction.map(|l| l.termination_after),
            Some(Duration::from_secs(90))
        );
    }
}
