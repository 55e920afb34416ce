//! Filler posts mixed into the feed.

use parking_lot::Mutex;
use qudpro_common::{
    model::{
        IdIssuer, QudproSnowflakeGenerator,
        post::{Author, Post, PostContent, PostOrigin},
    },
    snowflake::WorkerId,
};
use qudpro_feed::{SourceError, SyntheticSource};
use rand::Rng;
use std::{future::Future, num::NonZeroUsize};
use time::{Duration, UtcDateTime};

/// Generated posts are backdated by up to this many minutes.
pub const MAX_AGE_MINUTES: i64 = 2 * 24 * 60;
pub const MAX_LIKE_COUNT: u64 = 500;

struct Template {
    title: &'static str,
    category: &'static str,
    description: &'static str,
    media_url: &'static str,
    author_name: &'static str,
    author_role: &'static str,
    avatar_url: &'static str,
}

const TEMPLATES: [Template; 4] = [
    Template {
        title: "Cairo Business District",
        category: "Professional",
        description: "Capturing the essence of modern business in Egypt's capital",
        media_url: "https://source.unsplash.com/random/800x600/?cairo,business",
        author_name: "Ahmed Hassan",
        author_role: "Architectural Photographer",
        avatar_url: "https://source.unsplash.com/random/40x40/?portrait",
    },
    Template {
        title: "Alexandria Port",
        category: "Industrial",
        description: "A glimpse into Egypt's maritime commerce hub",
        media_url: "https://source.unsplash.com/random/800x600/?alexandria,port",
        author_name: "Sara Ahmed",
        author_role: "Industrial Photographer",
        avatar_url: "https://source.unsplash.com/random/40x40/?woman",
    },
    Template {
        title: "Tech Hub",
        category: "Technology",
        description: "Inside Egypt's growing tech ecosystem",
        media_url: "https://source.unsplash.com/random/800x600/?office,tech",
        author_name: "Mohamed Kamal",
        author_role: "Tech Photographer",
        avatar_url: "https://source.unsplash.com/random/40x40/?man",
    },
    Template {
        title: "Creative Space",
        category: "Design",
        description: "Where creativity meets productivity in Cairo",
        media_url: "https://source.unsplash.com/random/800x600/?creative,office",
        author_name: "Nour Ibrahim",
        author_role: "Interior Photographer",
        avatar_url: "https://source.unsplash.com/random/40x40/?girl",
    },
];

/// Picks random templates and backdates them by a random amount.
///
/// Each post gets its own snowflake so a generated batch never collides with
/// itself when it is merged into the feed.
#[derive(Debug)]
pub struct RandomPostSource {
    snowflake_generator: Mutex<QudproSnowflakeGenerator>,
}

impl RandomPostSource {
    #[must_use]
    pub fn new(worker_id: WorkerId) -> Self {
        Self {
            snowflake_generator: Mutex::new(IdIssuer::SyntheticSource.generator(worker_id)),
        }
    }

    fn random_posts(&self, count: NonZeroUsize) -> Vec<Post> {
        let mut rng = rand::rng();
        let now = UtcDateTime::now();

        (0..count.get())
            .map(|_| {
                let template = &TEMPLATES[rng.random_range(0..TEMPLATES.len())];
                let age = Duration::minutes(rng.random_range(0..=MAX_AGE_MINUTES));

                Post {
                    id: self.snowflake_generator.lock().generate().into(),
                    author: Author {
                        name: template.author_name.to_owned(),
                        role: template.author_role.to_owned(),
                        avatar_url: template.avatar_url.to_owned(),
                    },
                    content: PostContent {
                        title: template.title.to_owned(),
                        description: template.description.to_owned(),
                        media_url: template.media_url.to_owned(),
                        category: template.category.to_owned(),
                    },
                    like_count: rng.random_range(0..=MAX_LIKE_COUNT),
                    comments: Vec::new(),
                    created_at: now - age,
                    origin: PostOrigin::Synthetic,
                }
            })
            .collect()
    }
}

impl SyntheticSource for RandomPostSource {
    fn generate(
        &self,
        count: NonZeroUsize,
    ) -> impl Future<Output = Result<Vec<Post>, SourceError>> + Send {
        std::future::ready(Ok(self.random_posts(count)))
    }
}
