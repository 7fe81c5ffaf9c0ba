use crate::viewport::Viewport;

/// A named destination the control panel can fly to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bookmark {
    pub id: &'static str,
    pub label: &'static str,
    pub view: Viewport,
}

pub const BOOKMARKS: [Bookmark; 4] = [
    Bookmark {
        id: "dest0",
        label: "Spiral arm",
        view: Viewport::new(-0.8036284402834375, 0.18252764009245603, 0.0017168874184687476),
    },
    Bookmark {
        id: "dest1",
        label: "Period-three bulb",
        view: Viewport::new(-1.195852878464819, -0.31260127931769716, 0.02999999999999997),
    },
    Bookmark {
        id: "dest2",
        label: "Elephant valley",
        view: Viewport::new(0.28773359691377504, 0.011569467738227467, 0.0010047419752590714),
    },
    Bookmark {
        id: "dest3",
        label: "Upper bulb",
        view: Viewport::new(-0.5658287599483223, 0.5653723561505654, 0.057453340757295884),
    },
];
