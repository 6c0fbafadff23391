//! Producer contract

use crate::types::{
    BlockingInteractionResponse, EventParams, HandleEventsResponse, InteractionParams, Lifetime,
    MarkupContext, MarkupParams, RegistrationContext, RegistrationData, RuntimeContext,
    ServiceDescription, UserContext,
};
use async_trait::async_trait;
use clouber_core::Result;

/// Operations a portlet producer offers to consumers
///
/// Every call after `register` carries the [`RegistrationContext`] the
/// producer issued.
#[async_trait]
pub trait Producer: Send + Sync {
    /// Register a consumer and obtain a registration context
    async fn register(
        &self,
        registration: RegistrationData,
        lifetime: Option<Lifetime>,
        user: &UserContext,
    ) -> Result<RegistrationContext>;

    /// Describe the portlets the producer offers
    ///
    /// `portlet_handles` restricts the description to the given portlets.
    async fn get_service_description(
        &self,
        registration: &RegistrationContext,
        desired_locales: &[String],
        portlet_handles: Option<&[String]>,
        user: &UserContext,
    ) -> Result<ServiceDescription>;

    /// Run an interaction that must complete before the page is aggregated
    async fn perform_blocking_interaction(
        &self,
        registration: &RegistrationContext,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
        interaction: &InteractionParams,
    ) -> Result<BlockingInteractionResponse>;

    /// Deliver events to a portlet
    async fn handle_events(
        &self,
        registration: &RegistrationContext,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
        events: &EventParams,
    ) -> Result<HandleEventsResponse>;

    /// Render a portlet
    async fn get_markup(
        &self,
        registration: &RegistrationContext,
        portlet_handle: &str,
        runtime: &RuntimeContext,
        user: &UserContext,
        markup_params: &MarkupParams,
    ) -> Result<MarkupContext>;

    /// Producer type identifier
    fn producer_kind(&self) -> &'static str;
}
