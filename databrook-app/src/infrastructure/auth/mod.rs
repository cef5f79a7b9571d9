mod google_oauth;

pub use google_oauth::{GoogleOAuth, GoogleUserInfo, SignInRequest};
