//! Fixed fallback dataset, served when neither the live source nor the
//! cache has anything to offer.

use super::Post;

/// The three demonstration posts, stamped with the current time.
pub fn mock_posts() -> Vec<Post> {
    let now = chrono::Utc::now().timestamp() as f64;
    vec![
        mock_post(
            "mock_post_1",
            "[PAID] Can someone remove the person in the background?",
            "I love this photo of my dog, but the person walking behind ruins it. \
             Can anyone help? Will tip!",
            "https://placehold.co/600x400/000000/FFFFFF?text=Sample+Image+1",
            "mock_user_1",
            152,
            25,
            now,
        ),
        mock_post(
            "mock_post_2",
            "Please restore this old photo of my grandparents",
            "This is the only photo I have of them together. It's very faded and has \
             some scratches. Thank you in advance!",
            "https://placehold.co/600x400/333333/FFFFFF?text=Sample+Image+2",
            "mock_user_2",
            89,
            12,
            now,
        ),
        mock_post(
            "mock_post_3",
            "Can you change the color of my car to blue?",
            "Thinking about getting my car repainted. Can someone show me what it \
             would look like in a dark metallic blue?",
            "https://placehold.co/600x400/666666/FFFFFF?text=Sample+Image+3",
            "mock_user_3",
            45,
            8,
            now,
        ),
    ]
}

#[allow(clippy::too_many_arguments)]
fn mock_post(
    id: &str,
    title: &str,
    description: &str,
    image_url: &str,
    author: &str,
    score: i64,
    num_comments: i64,
    created_utc: f64,
) -> Post {
    Post {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        image_url: image_url.to_string(),
        post_url: "#".to_string(),
        created_utc,
        created_date: super::iso_date(created_utc),
        author: author.to_string(),
        score,
        num_comments,
        subreddit: crate::DEFAULT_SUBREDDIT.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn three_fixed_ids() {
        let ids: Vec<String> = mock_posts().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, ["mock_post_1", "mock_post_2", "mock_post_3"]);
    }

    #[test]
    fn every_mock_has_an_image() {
        for post in mock_posts() {
            assert!(post.image_url.starts_with("https://placehold.co/"));
            assert_eq!(post.subreddit, "PhotoshopRequest");
            assert!(!post.created_date.is_empty());
        }
    }
}
