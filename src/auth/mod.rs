pub mod cookies;
pub mod expiry;
pub mod refresh;

pub use cookies::{project, CookiePolicy, ProjectedCookie};
pub use expiry::{is_expired, Clock, FixedClock, SystemClock};
pub use refresh::{AuthStatus, RefreshCoordinator, TokenRefresher};
