use crate::runtime::config;

pub fn parse_size(text: &str) -> Result<usize, String> {
  if text == "auto" {
    Ok(config::DEFAULT_SIZE)
  } else {
    text.parse::<usize>().map_err(|x| format!("{}", x))
  }
}

pub fn parse_tids(text: &str) -> Result<usize, String> {
  if text == "auto" {
    Ok(config::default_tids())
  } else {
    text.parse::<usize>().map_err(|x| format!("{}", x))
  }
}
