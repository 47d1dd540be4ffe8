use super::{admin, assessments, status, students};
use axum::Router;
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;
use utoipa_redoc::{Redoc, Servable};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        status::get_status,
        assessments::start,
        assessments::answer,
        assessments::complete,
        assessments::get_session,
        students::history,
        students::progress,
        admin::create_pathway,
        admin::create_template,
        admin::list_templates,
        admin::create_item,
        admin::deactivate_item,
        admin::create_course,
        admin::archive_course,
        admin::create_lesson,
        admin::assign,
        admin::cancel_session,
        admin::get_recommendations,
        admin::override_recommendations,
    ),
    tags()
)]
struct ApiDoc;

pub(crate) fn create_router<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(Redoc::with_url("/redoc", ApiDoc::openapi()))
        .merge(RapiDoc::new("/api-docs/openapi.json").path("/rapidoc"))
}
