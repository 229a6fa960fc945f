use clap::ValueEnum;

/// One dashboard tab per managed collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Section {
    Orders,
    Medicines,
    Prescriptions,
    Categories,
    Pharmacies,
    Users,
    Notifications,
}

impl Section {
    pub const ALL: [Section; 7] = [
        Section::Orders,
        Section::Medicines,
        Section::Prescriptions,
        Section::Categories,
        Section::Pharmacies,
        Section::Users,
        Section::Notifications,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::Orders => "Orders",
            Self::Medicines => "Medicines",
            Self::Prescriptions => "Prescriptions",
            Self::Categories => "Categories",
            Self::Pharmacies => "Pharmacies",
            Self::Users => "Users",
            Self::Notifications => "Notifications",
        }
    }

    /// File-name friendly form, also used on the command line.
    pub fn slug(self) -> &'static str {
        match self {
            Self::Orders => "orders",
            Self::Medicines => "medicines",
            Self::Prescriptions => "prescriptions",
            Self::Categories => "categories",
            Self::Pharmacies => "pharmacies",
            Self::Users => "users",
            Self::Notifications => "notifications",
        }
    }

    pub fn index(self) -> usize {
        Self::ALL
            .iter()
            .position(|section| *section == self)
            .unwrap_or_default()
    }

    pub fn next(self) -> Self {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}
