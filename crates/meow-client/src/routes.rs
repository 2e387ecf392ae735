use crate::session::SessionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Join,
    Home,
    Calendar,
    AddMood,
    Profile,
    Insights,
    QnA,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::Join,
        Route::Home,
        Route::Calendar,
        Route::AddMood,
        Route::Profile,
        Route::Insights,
        Route::QnA,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Route::Join => "/join",
            Route::Home => "/",
            Route::Calendar => "/calendar",
            Route::AddMood => "/add-mood",
            Route::Profile => "/profile",
            Route::Insights => "/insights",
            Route::QnA => "/qna",
        }
    }

    pub fn from_path(path: &str) -> Option<Route> {
        let path = match path.trim_end_matches('/') {
            "" => "/",
            p => p,
        };
        Route::ALL.into_iter().find(|r| r.path() == path)
    }

    /// Everything except the join entry needs a session.
    pub fn is_protected(self) -> bool {
        self != Route::Join
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Render,
    /// Session restore is still running; render nothing protected yet.
    Wait,
    /// Identifiers are kept but the backend is unreachable. Show the
    /// connectivity banner and offer a retry instead of the join page.
    Offline,
    Redirect(Route),
}

/// Decide what to do with a navigation to `route` in session state `state`.
pub fn guard(route: Route, state: &SessionState) -> Guard {
    if !route.is_protected() {
        return Guard::Render;
    }
    match state {
        SessionState::Loading => Guard::Wait,
        SessionState::Active(_) => Guard::Render,
        SessionState::Offline { .. } => Guard::Offline,
        SessionState::LoggedOut => Guard::Redirect(Route::Join),
    }
}
