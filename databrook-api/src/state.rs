use databrook_app::infrastructure::auth::GoogleOAuth;
use databrook_app::AppContext;

#[derive(Clone)]
pub struct ApiState {
    pub app: AppContext,
    pub oauth: Option<GoogleOAuth>,
}
