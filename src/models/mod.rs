pub mod user;
pub mod theme;
pub mod dome;
pub mod show;
pub mod session;
pub mod reservation;
pub mod ticket;

pub use user::User;
pub use theme::ShowTheme;
pub use dome::PlanetariumDome;
pub use show::AstronomyShow;
pub use session::ShowSession;
pub use reservation::Reservation;
pub use ticket::Ticket;
